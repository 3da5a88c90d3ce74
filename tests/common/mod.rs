//! Mock services and helpers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use nodeflow::runtime::services::{
    CommandOutput, CommandRequest, CommandService, DatabaseService, DecryptService, HttpRequest, HttpResponse,
    HttpService,
};
use nodeflow::runtime::{ExecutionEngine, LogEntry, NodeExecutor, RunCallbacks, RunStatus, Services};
use nodeflow::workflow::{NodeState, Workflow};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Answers by URL, 404 for anything unknown
#[derive(Default)]
pub struct RoutedHttp {
    pub routes: Mutex<HashMap<String, (u16, String)>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl RoutedHttp {
    pub fn route(self, url: &str, status: u16, body: &str) -> Self {
        self.routes.lock().insert(url.to_string(), (status, body.to_string()));
        self
    }
}

#[async_trait]
impl HttpService for RoutedHttp {
    async fn request(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let route = self.routes.lock().get(&request.url).cloned();
        self.requests.lock().push(request);
        let (status, body) = route.unwrap_or((404, "not found".to_string()));
        Ok(HttpResponse {
            status,
            status_text: String::new(),
            headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
            body,
        })
    }
}

/// `echo X` prints X, `fail` exits 1, `slow` takes 300 ms
pub struct ScriptedExec;

#[async_trait]
impl CommandService for ScriptedExec {
    async fn execute(&self, request: CommandRequest) -> anyhow::Result<CommandOutput> {
        let command = request.command.trim();
        if command == "slow" {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        let exit_code = if command == "fail" { 1 } else { 0 };
        Ok(CommandOutput {
            stdout: format!("{}\n", command.strip_prefix("echo ").unwrap_or(command)),
            stderr: String::new(),
            exit_code: Some(exit_code),
        })
    }
}

/// No connection is configured
pub struct NoDatabase;

#[async_trait]
impl DatabaseService for NoDatabase {
    fn has_connection(&self, _connection_id: &str) -> bool {
        false
    }

    async fn query(&self, connection_id: &str, _sql: &str, _params: &[Value]) -> anyhow::Result<Vec<Value>> {
        anyhow::bail!("unknown connection {}", connection_id)
    }
}

pub struct PlainDecrypt;

impl DecryptService for PlainDecrypt {
    fn decrypt(&self, ciphertext: &str) -> anyhow::Result<String> {
        Ok(ciphertext.to_string())
    }
}

pub fn services_with(http: Arc<RoutedHttp>) -> Services {
    Services {
        http,
        db: Arc::new(NoDatabase),
        exec: Arc::new(ScriptedExec),
        decrypt: Arc::new(PlainDecrypt),
    }
}

pub fn services() -> Services {
    services_with(Arc::new(RoutedHttp::default()))
}

pub fn engine() -> Arc<ExecutionEngine> {
    Arc::new(ExecutionEngine::new(Arc::new(NodeExecutor::new(Duration::from_secs(5)))))
}

pub fn workflow(value: Value) -> Arc<Workflow> {
    Arc::new(serde_json::from_value(value).expect("workflow fixture"))
}

/// Callbacks that remember everything they were told
#[derive(Default)]
pub struct Recorder {
    pub logs: Mutex<Vec<LogEntry>>,
    pub statuses: Mutex<Vec<RunStatus>>,
    pub executing: Mutex<Vec<Vec<String>>>,
    pub updates: Mutex<Vec<(String, NodeState)>>,
    pub environments: Mutex<Vec<HashMap<String, String>>>,
}

impl Recorder {
    pub fn logged_names(&self) -> Vec<String> {
        self.logs.lock().iter().map(|e| e.name.clone()).collect()
    }
}

impl RunCallbacks for Recorder {
    fn on_log(&self, entry: &LogEntry) {
        self.logs.lock().push(entry.clone());
    }

    fn on_executing_change(&self, executing: &[String]) {
        self.executing.lock().push(executing.to_vec());
    }

    fn on_node_update(&self, node_id: &str, state: &NodeState) {
        self.updates.lock().push((node_id.to_string(), state.clone()));
    }

    fn on_status_change(&self, status: RunStatus) {
        self.statuses.lock().push(status);
    }

    fn on_environment_change(&self, variables: &HashMap<String, String>) {
        self.environments.lock().push(variables.clone());
    }
}
