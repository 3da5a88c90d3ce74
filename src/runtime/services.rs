/// Injected services: the only way node executors reach the outside world
///
/// The engine never opens sockets, spawns processes or touches databases
/// itself. Embedders hand in `Services`; `crate::services` provides default
/// implementations and tests provide mocks.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Outgoing HTTP request with templates already rendered
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    /// Lower-cased header names
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

#[async_trait]
pub trait HttpService: Send + Sync {
    /// Perform a request; only transport failures are errors
    async fn request(&self, request: HttpRequest) -> anyhow::Result<HttpResponse>;
}

/// Shell command with templates already rendered
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub command: String,
    pub cwd: Option<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait CommandService: Send + Sync {
    async fn execute(&self, request: CommandRequest) -> anyhow::Result<CommandOutput>;
}

#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Whether a connection with this id is configured
    fn has_connection(&self, connection_id: &str) -> bool;

    /// Run a query with positional parameters, returning rows as objects
    async fn query(&self, connection_id: &str, sql: &str, params: &[Value]) -> anyhow::Result<Vec<Value>>;
}

pub trait DecryptService: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> anyhow::Result<String>;
}

/// Bundle of services handed to every run
#[derive(Clone)]
pub struct Services {
    pub http: Arc<dyn HttpService>,
    pub db: Arc<dyn DatabaseService>,
    pub exec: Arc<dyn CommandService>,
    pub decrypt: Arc<dyn DecryptService>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
