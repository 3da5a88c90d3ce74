/// Configuration management for the nodeflow engine
///
/// Handles server configuration, engine limits and database connections.
/// Every value can be overridden through `NODEFLOW_*` environment variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Engine limits
    pub engine: EngineConfig,
    /// Database files reachable from database nodes
    pub storage: StorageConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for HTTP, command, database, prompt and RSS nodes that set none
    pub node_timeout_ms: u64,
    /// Undo steps kept by the workflow document
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory relative database paths resolve against (default: "data")
    pub data_dir: String,
    /// Connection id to SQLite file path
    pub connections: BTreeMap<String, String>,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("NODEFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("NODEFLOW_PORT")
                    .unwrap_or_else(|_| "3004".to_string())
                    .parse()
                    .unwrap_or(3004),
            },
            engine: EngineConfig {
                node_timeout_ms: std::env::var("NODEFLOW_NODE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30_000),
                history_limit: std::env::var("NODEFLOW_HISTORY_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(100),
            },
            storage: StorageConfig {
                data_dir: std::env::var("NODEFLOW_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
                connections: std::env::var("NODEFLOW_DB_CONNECTIONS")
                    .map(|v| parse_connections(&v))
                    .unwrap_or_default(),
            },
        }
    }
}

/// Parse `id=path` pairs separated by commas, e.g. `main=main.db,logs=/var/lib/logs.db`
pub fn parse_connections(spec: &str) -> BTreeMap<String, String> {
    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.split_once('=') {
            Some((id, path)) if !id.trim().is_empty() && !path.trim().is_empty() => {
                Some((id.trim().to_string(), path.trim().to_string()))
            }
            _ => {
                tracing::warn!("⚠️ Ignoring malformed database connection entry '{}'", entry);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connections_parse_and_skip_malformed_entries() {
        let parsed = parse_connections(" main = main.db , broken, =x.db ,logs=/tmp/logs.db,");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["main"], "main.db");
        assert_eq!(parsed["logs"], "/tmp/logs.db");
    }
}
