/// Parser node: select a sub-object from upstream data with a path expression
///
/// The input selector (a path into all run outputs, e.g. `HTTP_01.response`)
/// picks what to parse; without one the sole predecessor's output is used.
/// String inputs are parsed as XML in xml mode and as JSON in json mode.

use super::{Execute, NodeContext, NodeOutput};
use crate::error::NodeError;
use crate::expression::{xml, PathExpr};
use crate::runtime::services::Services;
use crate::workflow::types::{ParserConfig, ParserMode};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
impl Execute for ParserConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, _services: &Services) -> Result<NodeOutput, NodeError> {
        let source = match self.input.as_deref().map(str::trim) {
            Some(selector) if !selector.is_empty() => PathExpr::parse(selector)?
                .evaluate(ctx.scope.data)
                .unwrap_or(Value::Null),
            _ => ctx.primary_input(),
        };

        let document = match (self.mode, source) {
            (ParserMode::Xml, Value::String(text)) => xml::to_value(&text)?,
            (ParserMode::Json, Value::String(text)) => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            (_, other) => other,
        };

        let result = PathExpr::parse(&self.path)?.evaluate(&document);
        if result.is_none() {
            tracing::debug!("🔎 Path '{}' matched nothing", self.path);
        }

        Ok(NodeOutput::new(result.unwrap_or(Value::Null)))
    }
}
