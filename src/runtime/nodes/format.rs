/// Format node: render a template, optionally as JSON

use super::{Execute, NodeContext, NodeOutput};
use crate::error::NodeError;
use crate::runtime::services::Services;
use crate::workflow::types::{FormatConfig, FormatMode};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
impl Execute for FormatConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, _services: &Services) -> Result<NodeOutput, NodeError> {
        let rendered = ctx.render(&self.template)?;
        let data = match self.mode {
            FormatMode::Text => Value::String(rendered),
            FormatMode::Json => serde_json::from_str(&rendered).map_err(|e| {
                NodeError::Evaluation(format!("formatted output is not valid JSON: {}", e))
            })?,
        };
        Ok(NodeOutput::new(data))
    }
}
