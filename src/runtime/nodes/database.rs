/// SQL query node against a named, pre-configured connection

use super::{Execute, NodeContext, NodeOutput};
use crate::error::NodeError;
use crate::runtime::services::Services;
use crate::workflow::types::DatabaseConfig;
use async_trait::async_trait;
use serde_json::json;

#[async_trait]
impl Execute for DatabaseConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, services: &Services) -> Result<NodeOutput, NodeError> {
        let connection_id = self.connection_id.trim();
        if connection_id.is_empty() {
            return Err(NodeError::Configuration("no database connection selected".to_string()));
        }
        if !services.db.has_connection(connection_id) {
            return Err(NodeError::Configuration(format!(
                "unknown database connection '{}'",
                connection_id
            )));
        }
        if self.query.trim().is_empty() {
            return Err(NodeError::Configuration("database node has no query".to_string()));
        }

        let sql = ctx.render(&self.query)?;
        let params = self
            .parameters
            .iter()
            .map(|p| ctx.render_value(p))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("🗄️ Query on '{}': {} ({} params)", connection_id, sql, params.len());

        let rows = services
            .db
            .query(connection_id, &sql, &params)
            .await
            .map_err(|e| NodeError::External(format!("query failed: {}", e)))?;

        tracing::info!("📊 Query returned {} rows", rows.len());

        Ok(NodeOutput::new(json!({
            "rowCount": rows.len(),
            "rows": rows,
        })))
    }
}
