/// Node dispatch
///
/// Validates a node's configuration, dispatches to the executor for its type
/// with a `match` on the config enum, and enforces the per-node timeout for
/// node types that call external services.

use crate::error::NodeError;
use crate::runtime::nodes::{Execute, NodeContext, NodeOutput};
use crate::runtime::services::Services;
use crate::workflow::types::{Node, NodeConfig};
use std::time::{Duration, Instant};

/// Dispatches single node executions
#[derive(Debug, Clone)]
pub struct NodeExecutor {
    /// Timeout for external calls when a node sets none
    default_timeout: Duration,
}

impl NodeExecutor {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Effective timeout of a node
    pub fn timeout_for(&self, node: &Node) -> Duration {
        node.config
            .timeout_ms()
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout)
    }

    /// Execute a single node
    ///
    /// Configuration is re-checked before dispatch so a bad node fails
    /// without attempting its action.
    pub async fn execute_node(
        &self,
        node: &Node,
        ctx: &NodeContext<'_>,
        services: &Services,
    ) -> Result<NodeOutput, NodeError> {
        tracing::info!("🚀 Starting node execution: {} (type: {})", node.id, node.node_type());
        tracing::debug!(
            "📥 Input data: {}",
            serde_json::to_string(ctx.input).unwrap_or_else(|_| "invalid_json".to_string())
        );

        let start_time = Instant::now();

        let result = match node.validate() {
            Ok(()) if node.node_type().performs_io() => {
                match tokio::time::timeout(ctx.timeout, dispatch(&node.config, ctx, services)).await {
                    Ok(result) => result,
                    Err(_) => Err(NodeError::External(format!(
                        "timed out after {} ms",
                        ctx.timeout.as_millis()
                    ))),
                }
            }
            Ok(()) => dispatch(&node.config, ctx, services).await,
            Err(e) => Err(e),
        };

        let duration = start_time.elapsed();

        match &result {
            Ok(output) => {
                match &output.failure {
                    None => tracing::info!("✅ Node execution completed: {} in {:?}", node.id, duration),
                    Some(e) => tracing::warn!("⚠️ Node '{}' finished with failure in {:?}: {}", node.id, duration, e),
                }
                tracing::debug!(
                    "📤 Output data: {}",
                    serde_json::to_string(&output.data).unwrap_or_else(|_| "invalid_json".to_string())
                );
            }
            Err(e) => {
                tracing::error!("❌ Node execution failed: {} in {:?} - Error: {}", node.id, duration, e);
            }
        }

        result
    }
}

async fn dispatch(config: &NodeConfig, ctx: &NodeContext<'_>, services: &Services) -> Result<NodeOutput, NodeError> {
    match config {
        NodeConfig::Http(c) => c.execute(ctx, services).await,
        NodeConfig::Command(c) => c.execute(ctx, services).await,
        NodeConfig::Database(c) => c.execute(ctx, services).await,
        NodeConfig::Parser(c) => c.execute(ctx, services).await,
        NodeConfig::Format(c) => c.execute(ctx, services).await,
        NodeConfig::Conditional(c) => c.execute(ctx, services).await,
        NodeConfig::Iterator(c) => c.execute(ctx, services).await,
        NodeConfig::Collector(c) => c.execute(ctx, services).await,
        NodeConfig::Counter(c) => c.execute(ctx, services).await,
        NodeConfig::Test(c) => c.execute(ctx, services).await,
        NodeConfig::Prompt(c) => c.execute(ctx, services).await,
        NodeConfig::Rss(c) => c.execute(ctx, services).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::nodes::testing::{services, Fixture, MockHttp};
    use crate::runtime::services::{CommandOutput, CommandRequest, CommandService};
    use crate::workflow::types::{CommandConfig, FormatConfig, FormatMode, ParserConfig, ParserMode};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct SlowExec;

    #[async_trait]
    impl CommandService for SlowExec {
        async fn execute(&self, _request: CommandRequest) -> anyhow::Result<CommandOutput> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            anyhow::bail!("unreachable")
        }
    }

    #[tokio::test]
    async fn io_nodes_time_out() {
        let fixture = Fixture::from_source(json!({}));
        let mut ctx = fixture.ctx();
        ctx.timeout = Duration::from_millis(20);
        let mut svc = services(Arc::new(MockHttp::default()));
        svc.exec = Arc::new(SlowExec);

        let node = Node::new(
            "COMMAND_01",
            NodeConfig::Command(CommandConfig {
                command: "sleep 60".to_string(),
                cwd: None,
                timeout_ms: Some(20),
                env: vec![],
                variable: None,
            }),
        );
        let executor = NodeExecutor::new(Duration::from_secs(30));
        assert_eq!(executor.timeout_for(&node), Duration::from_millis(20));

        let err = executor.execute_node(&node, &ctx, &svc).await.unwrap_err();
        assert!(matches!(err, NodeError::External(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn invalid_configuration_is_not_dispatched() {
        let fixture = Fixture::from_source(json!({"a": 1}));
        let node = Node::new(
            "PARSER_01",
            NodeConfig::Parser(ParserConfig {
                mode: ParserMode::Json,
                path: "a..".to_string(),
                input: None,
            }),
        );
        let executor = NodeExecutor::new(Duration::from_secs(1));
        let err = executor
            .execute_node(&node, &fixture.ctx(), &services(Arc::new(MockHttp::default())))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "evaluation");
    }

    #[tokio::test]
    async fn dispatches_by_config_type() {
        let fixture = Fixture::from_source(json!({"name": "x"}));
        let node = Node::new(
            "FORMAT_01",
            NodeConfig::Format(FormatConfig {
                mode: FormatMode::Text,
                template: "hi {{SRC.name}}".to_string(),
            }),
        );
        let out = NodeExecutor::new(Duration::from_secs(1))
            .execute_node(&node, &fixture.ctx(), &services(Arc::new(MockHttp::default())))
            .await
            .unwrap();
        assert_eq!(out.data, json!("hi x"));
    }
}
