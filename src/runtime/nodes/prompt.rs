/// Prompt node: single-turn completion against a configured AI integration
///
/// The integration's API key is stored encrypted and decrypted through the
/// injected decrypt service right before the call. Requests go through the
/// HTTP service so they share timeouts and mocking with the HTTP node.

use super::{Execute, NodeContext, NodeOutput};
use crate::error::NodeError;
use crate::runtime::services::{HttpRequest, Services};
use crate::workflow::types::{Integration, PromptConfig, Provider};
use async_trait::async_trait;
use serde_json::{json, Value};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[async_trait]
impl Execute for PromptConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, services: &Services) -> Result<NodeOutput, NodeError> {
        let integration = find_integration(ctx.integrations, &self.integration_id)?;

        if integration.api_key.trim().is_empty() {
            return Err(NodeError::Configuration(format!(
                "integration '{}' has no API key",
                integration.id
            )));
        }
        let api_key = services.decrypt.decrypt(&integration.api_key).map_err(|e| {
            NodeError::Configuration(format!("cannot decrypt API key of '{}': {}", integration.id, e))
        })?;

        let model = self
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(integration.model.as_str())
            .to_string();
        if model.is_empty() {
            return Err(NodeError::Configuration("no model configured".to_string()));
        }

        if self.prompt.trim().is_empty() {
            return Err(NodeError::Configuration("prompt node has no prompt".to_string()));
        }
        let prompt = ctx.render(&self.prompt)?;
        let max_tokens = self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        let request = build_request(integration, &api_key, &model, &prompt, max_tokens, ctx);

        tracing::info!("🤖 Prompting {:?} model '{}'", integration.provider, model);

        let response = services
            .http
            .request(request)
            .await
            .map_err(|e| NodeError::External(format!("AI request failed: {}", e)))?;

        if !response.is_success() {
            let detail: String = response.body.chars().take(500).collect();
            return Err(NodeError::External(format!(
                "AI provider returned {}: {}",
                response.status, detail
            )));
        }

        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| NodeError::External(format!("AI provider returned invalid JSON: {}", e)))?;

        let text = match integration.provider {
            Provider::OpenAi => body["choices"][0]["message"]["content"]
                .as_str()
                .map(str::to_string),
            Provider::Anthropic => body["content"].as_array().map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|b| b.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("")
            }),
        }
        .ok_or_else(|| NodeError::External("AI response contained no text".to_string()))?;

        Ok(NodeOutput::new(json!({
            "text": text,
            "model": body.get("model").cloned().unwrap_or(Value::String(model)),
            "provider": integration.provider,
            "usage": body.get("usage").cloned().unwrap_or(Value::Null),
        })))
    }
}

fn find_integration<'a>(integrations: &'a [Integration], id: &str) -> Result<&'a Integration, NodeError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(NodeError::Configuration("no integration selected".to_string()));
    }
    integrations
        .iter()
        .find(|i| i.id == id)
        .ok_or_else(|| NodeError::Configuration(format!("integration '{}' is not configured", id)))
}

fn build_request(
    integration: &Integration,
    api_key: &str,
    model: &str,
    prompt: &str,
    max_tokens: u32,
    ctx: &NodeContext<'_>,
) -> HttpRequest {
    let messages = json!([{ "role": "user", "content": prompt }]);

    let (default_base, path, headers) = match integration.provider {
        Provider::OpenAi => (
            OPENAI_API_URL,
            "chat/completions",
            vec![("Authorization".to_string(), format!("Bearer {}", api_key))],
        ),
        Provider::Anthropic => (
            ANTHROPIC_API_URL,
            "messages",
            vec![
                ("x-api-key".to_string(), api_key.to_string()),
                ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
            ],
        ),
    };

    let base = integration
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(default_base);

    let mut headers = headers;
    headers.push(("content-type".to_string(), "application/json".to_string()));

    let body = json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": messages,
    });

    HttpRequest {
        method: "POST".to_string(),
        url: format!("{}/{}", base.trim_end_matches('/'), path),
        headers,
        query: Vec::new(),
        body: Some(body.to_string()),
        timeout: Some(ctx.timeout),
    }
}
