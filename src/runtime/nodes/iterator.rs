/// Iterator node: one downstream execution per element
///
/// Input mode takes an array from the primary input (optionally through a
/// path); anything that is not an array yields zero iterations. Custom mode
/// splits a rendered newline-separated list. Each iteration payload is
/// `{item, index, total, context}` where `context` is the iterator's input.

use super::{Execute, NodeContext, NodeOutput, Propagation};
use crate::error::NodeError;
use crate::runtime::services::Services;
use crate::workflow::types::{IteratorConfig, IteratorMode};
use async_trait::async_trait;
use serde_json::{json, Value};

#[async_trait]
impl Execute for IteratorConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, _services: &Services) -> Result<NodeOutput, NodeError> {
        let items: Vec<Value> = match self.mode {
            IteratorMode::Input => match ctx.select(self.path.as_deref())? {
                Some(Value::Array(items)) => items,
                other => {
                    tracing::debug!("🔁 Iterator source is not an array: {:?}", other);
                    Vec::new()
                }
            },
            IteratorMode::Custom => ctx
                .render(&self.items)?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| Value::String(line.to_string()))
                .collect(),
        };

        let total = items.len();
        let context = ctx.primary_input();
        let payloads = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                json!({
                    "item": item,
                    "index": index,
                    "total": total,
                    "context": context,
                })
            })
            .collect();

        tracing::info!("🔁 Iterator '{}' produced {} iterations", ctx.node_id, total);

        Ok(NodeOutput::new(json!({ "items": items, "count": total }))
            .with_propagation(Propagation::Iterate(payloads)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{services, Fixture, MockHttp};
    use super::*;
    use std::sync::Arc;

    async fn payloads(config: IteratorConfig, fixture: &Fixture) -> Vec<Value> {
        let out = config
            .execute(&fixture.ctx(), &services(Arc::new(MockHttp::default())))
            .await
            .unwrap();
        match out.propagation {
            Propagation::Iterate(payloads) => payloads,
            other => panic!("expected iteration, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn input_mode_iterates_array_path() {
        let fixture = Fixture::from_source(json!({"users": [{"n": "a"}, {"n": "b"}]}));
        let config = IteratorConfig {
            mode: IteratorMode::Input,
            path: Some("users".to_string()),
            items: String::new(),
        };
        let items = payloads(config, &fixture).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["item"], json!({"n": "b"}));
        assert_eq!(items[1]["index"], 1);
        assert_eq!(items[1]["total"], 2);
        assert_eq!(items[0]["context"]["users"][0]["n"], "a");
    }

    #[tokio::test]
    async fn non_array_gives_zero_iterations() {
        let fixture = Fixture::from_source(json!({"users": "nope"}));
        let config = IteratorConfig {
            mode: IteratorMode::Input,
            path: Some("users".to_string()),
            items: String::new(),
        };
        assert!(payloads(config, &fixture).await.is_empty());
    }

    #[tokio::test]
    async fn custom_mode_splits_lines() {
        let mut fixture = Fixture::from_source(json!({}));
        fixture.env.insert("EXTRA".to_string(), "gamma".to_string());
        let config = IteratorConfig {
            mode: IteratorMode::Custom,
            path: None,
            items: "alpha\n\n  beta \n{{$EXTRA}}".to_string(),
        };
        let items: Vec<Value> = payloads(config, &fixture).await.into_iter().map(|p| p["item"].clone()).collect();
        assert_eq!(items, vec![json!("alpha"), json!("beta"), json!("gamma")]);
    }
}
