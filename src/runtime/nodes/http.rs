/// HTTP request node
///
/// URL, headers, query parameters and body are templates. The response body
/// is decoded as JSON when possible, converted from XML for XML content
/// types, and kept as text otherwise. A non-2xx status is still a successful
/// execution; `ok` in the output reflects it.

use super::{bind_variable, headers_object, Execute, NodeContext, NodeOutput};
use crate::error::NodeError;
use crate::expression::xml;
use crate::runtime::services::{HttpRequest, HttpResponse, Services};
use crate::workflow::types::HttpConfig;
use async_trait::async_trait;
use serde_json::{json, Value};

#[async_trait]
impl Execute for HttpConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, services: &Services) -> Result<NodeOutput, NodeError> {
        if self.url.trim().is_empty() {
            return Err(NodeError::Configuration("HTTP node has no URL".to_string()));
        }

        let url = ctx.render(self.url.trim())?;
        let method = self.method.to_uppercase();
        let mut headers = ctx.render_pairs(&self.headers)?;
        let query = ctx.render_pairs(&self.params)?;

        let body = match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => Some(ctx.render(body)?),
            _ => None,
        };

        // JSON bodies get a content type unless the user set one
        let has_content_type = headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
        if let Some(body) = &body {
            if !has_content_type && serde_json::from_str::<Value>(body).is_ok() {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
            }
        }

        tracing::debug!("🌍 HTTP Request: {} {}", method, url);
        tracing::debug!("📋 Headers: {:?}", headers);

        let request = HttpRequest {
            method: method.clone(),
            url: url.clone(),
            headers,
            query,
            body,
            timeout: Some(ctx.timeout),
        };

        let response = services
            .http
            .request(request)
            .await
            .map_err(|e| NodeError::External(format!("HTTP request failed: {}", e)))?;

        tracing::debug!("📡 Response status: {}", response.status);

        let output = json!({
            "response": {
                "status": response.status,
                "statusText": response.status_text,
                "ok": response.is_success(),
                "headers": headers_object(response.headers.iter()),
                "data": decode_body(&response),
            }
        });

        tracing::info!("✅ HTTP request completed: {} {} (status: {})", method, url, response.status);

        let writes = bind_variable(self.variable.as_ref(), &output, "response.data")?;
        Ok(NodeOutput::new(output).with_variables(writes))
    }
}

/// Decode a response body into JSON, converted XML, or text
pub(crate) fn decode_body(response: &HttpResponse) -> Value {
    let content_type = response.content_type().unwrap_or_default().to_lowercase();

    if let Ok(value) = serde_json::from_str::<Value>(&response.body) {
        return value;
    }
    if content_type.contains("xml") {
        match xml::to_value(&response.body) {
            Ok(value) => return value,
            Err(e) => tracing::warn!("⚠️ Response declared XML but could not be parsed: {}", e),
        }
    }
    Value::String(response.body.clone())
}
