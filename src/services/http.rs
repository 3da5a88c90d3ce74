use crate::runtime::services::{HttpRequest, HttpResponse, HttpService};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// HTTP service over a shared reqwest client
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpService {
    client: reqwest::Client,
}

impl ReqwestHttpService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpService for ReqwestHttpService {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| anyhow::anyhow!("Unsupported HTTP method: {}", request.method))?;

        tracing::debug!("🌍 HTTP Request: {} {}", method, request.url);

        let mut request_builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            request_builder = request_builder.header(key, value);
        }
        if !request.query.is_empty() {
            request_builder = request_builder.query(&request.query);
        }
        if let Some(body) = request.body {
            request_builder = request_builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            request_builder = request_builder.timeout(timeout);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("HTTP request failed: {}", e))?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.as_str().to_lowercase(), s.to_string())))
            .collect();
        let body = response.text().await?;

        tracing::debug!("📨 HTTP Response: {} ({} bytes)", status, body.len());

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
