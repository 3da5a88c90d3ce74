/// SQLite database service for database nodes
///
/// Connection ids map to database files. Pools are opened on first use and
/// cached; a pool is never created for an id that is not configured.

use crate::runtime::services::DatabaseService;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::{Column, Row};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct SqliteDatabaseService {
    /// Connection id to database file
    connections: BTreeMap<String, PathBuf>,
    /// Connection pools opened so far
    pools: RwLock<HashMap<String, SqlitePool>>,
}

impl SqliteDatabaseService {
    /// Relative paths resolve against `data_dir`
    pub fn new(data_dir: &str, connections: &BTreeMap<String, String>) -> Self {
        let connections = connections
            .iter()
            .map(|(id, path)| {
                let path = Path::new(path);
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    Path::new(data_dir).join(path)
                };
                (id.clone(), path)
            })
            .collect();

        Self {
            connections,
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the pool of a configured connection
    async fn pool(&self, connection_id: &str) -> Result<SqlitePool> {
        // Try read lock first (fast path for existing pools)
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(connection_id) {
                return Ok(pool.clone());
            }
        }

        let db_path = self
            .connections
            .get(connection_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown database connection: {}", connection_id))?;

        let mut pools = self.pools.write().await;

        // Double-check pattern (another task might have created it)
        if let Some(pool) = pools.get(connection_id) {
            return Ok(pool.clone());
        }

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create directory '{}': {}", parent.display(), e))?;
        }

        tracing::info!("🗄️ Opening database pool '{}': {}", connection_id, db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        pools.insert(connection_id.to_string(), pool.clone());
        Ok(pool)
    }
}

#[async_trait]
impl DatabaseService for SqliteDatabaseService {
    fn has_connection(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    async fn query(&self, connection_id: &str, sql: &str, params: &[Value]) -> Result<Vec<Value>> {
        let pool = self.pool(connection_id).await?;

        tracing::debug!("🔍 Executing query on '{}': {}", connection_id, sql);

        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<String>),
                Value::Bool(b) => query.bind(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => query.bind(i),
                    None => query.bind(n.as_f64().unwrap_or_default()),
                },
                Value::String(s) => query.bind(s.clone()),
                other => query.bind(other.to_string()),
            };
        }

        let rows = query.fetch_all(&pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn row_to_json(row: &SqliteRow) -> Value {
    let mut object = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), column_value(row, i));
    }
    Value::Object(object)
}

/// Decode a column by trying SQLite storage classes in turn
fn column_value(row: &SqliteRow, index: usize) -> Value {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(Some(value)) = row.try_get::<Option<f64>, _>(index) {
        return Value::from(value);
    }
    if let Ok(Some(value)) = row.try_get::<Option<String>, _>(index) {
        return Value::String(value);
    }
    if let Ok(Some(bytes)) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return Value::String(String::from_utf8_lossy(&bytes).into_owned());
    }
    Value::Null
}
