/// Counter node: pass through until the persisted count reaches the limit

use super::{Execute, NodeContext, NodeOutput, Propagation};
use crate::error::NodeError;
use crate::runtime::services::Services;
use crate::runtime::state::CounterOutcome;
use crate::workflow::types::CounterConfig;
use async_trait::async_trait;
use serde_json::json;

#[async_trait]
impl Execute for CounterConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, _services: &Services) -> Result<NodeOutput, NodeError> {
        match ctx.store.try_increment(ctx.node_id, self.limit) {
            CounterOutcome::Passed(count) => Ok(NodeOutput::new(json!({
                "count": count,
                "limit": self.limit,
                "paused": false,
                "input": ctx.primary_input(),
            }))),
            CounterOutcome::Paused(count) => {
                tracing::info!("⏸️ Counter '{}' reached its limit of {}", ctx.node_id, self.limit);
                Ok(NodeOutput::new(json!({
                    "count": count,
                    "limit": self.limit,
                    "paused": true,
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
    async fn suppresses_once_limit_reached() {
        let fixture = Fixture::from_source(json!({}));
        let svc = services(Arc::new(MockHttp::default()));
        let config = CounterConfig { limit: 1 };

        let first = config.execute(&fixture.ctx(), &svc).await.unwrap();
        assert_eq!(first.propagation, Propagation::All);
        assert_eq!(first.data["count"], 1);

        let second = config.execute(&fixture.ctx(), &svc).await.unwrap();
        assert_eq!(second.propagation, Propagation::Suppress);
        assert_eq!(second.data["paused"], true);
    }
}
