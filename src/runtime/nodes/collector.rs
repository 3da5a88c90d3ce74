/// Collector node: accumulate values across iterations and runs
///
/// Arrays are appended element by element. In batch mode downstream fires
/// only when the accumulated length reaches the batch size, receiving the
/// batch, after which the collector starts empty again.

use super::{Execute, NodeContext, NodeOutput, Propagation};
use crate::error::NodeError;
use crate::runtime::services::Services;
use crate::runtime::state::CollectOutcome;
use crate::workflow::types::CollectorConfig;
use async_trait::async_trait;
use serde_json::{json, Value};

#[async_trait]
impl Execute for CollectorConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, _services: &Services) -> Result<NodeOutput, NodeError> {
        let values = match ctx.select(self.path.as_deref())? {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(value) => vec![value],
        };

        let batch_size = self.batch.then_some(self.batch_size.max(1));

        match ctx.store.collect(ctx.node_id, values, self.make_unique, batch_size) {
            CollectOutcome::Emit(items) => {
                tracing::debug!("📦 Collector '{}' emitting {} items", ctx.node_id, items.len());
                Ok(NodeOutput::new(json!({ "count": items.len(), "items": items })))
            }
            CollectOutcome::Pending(count) => {
                tracing::debug!(
                    "📦 Collector '{}' holding {}/{} items",
                    ctx.node_id,
                    count,
                    self.batch_size
                );
                Ok(NodeOutput::new(json!({
                    "count": count,
                    "batchSize": self.batch_size,
                    "pending": true,
                }))
                .with_propagation(Propagation::Suppress))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{services, Fixture, MockHttp};
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn batches_across_executions() {
        let fixture = Fixture::from_source(json!({"item": "x"}));
        let svc = services(Arc::new(MockHttp::default()));
        let config = CollectorConfig {
            path: Some("item".to_string()),
            make_unique: false,
            batch: true,
            batch_size: 2,
        };

        let first = config.execute(&fixture.ctx(), &svc).await.unwrap();
        assert_eq!(first.propagation, Propagation::Suppress);

        let second = config.execute(&fixture.ctx(), &svc).await.unwrap();
        assert_eq!(second.propagation, Propagation::All);
        assert_eq!(second.data["items"], json!(["x", "x"]));
        assert!(fixture.store.get("NODE_01").unwrap().collected.is_empty());
    }

    #[tokio::test]
    async fn arrays_extend_and_dedupe() {
        let fixture = Fixture::from_source(json!({"tags": ["a", "b", "a"]}));
        let config = CollectorConfig {
            path: Some("tags".to_string()),
            make_unique: true,
            batch: false,
            batch_size: 0,
        };
        let out = config
            .execute(&fixture.ctx(), &services(Arc::new(MockHttp::default())))
            .await
            .unwrap();
        assert_eq!(out.data, json!({"count": 2, "items": ["a", "b"]}));
    }
}
