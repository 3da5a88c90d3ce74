/// Node Executor Registry
///
/// One executor per node type. Each config struct implements `Execute`:
/// it receives the rendered context and the injected services and returns a
/// `NodeOutput`. Executors never touch the graph; branching, looping and
/// suppression are expressed through `Propagation` and applied by the engine.

use crate::error::NodeError;
use crate::expression::template::{self, Scope};
use crate::expression::PathExpr;
use crate::runtime::services::Services;
use crate::runtime::state::NodeStateStore;
use crate::workflow::types::{Integration, KeyValue, VariableBinding};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

// HTTP request node
pub mod http;

// Shell command node
pub mod command;

// SQL query node
pub mod database;

// Path extraction from JSON/XML
pub mod parser;

// Template formatting
pub mod format;

// Branch selection
pub mod conditional;

// Loop over array elements
pub mod iterator;

// Persistent accumulation and batching
pub mod collector;

// Bounded pass-through
pub mod counter;

// Assertions against other nodes' results
pub mod test;

// AI provider completion
pub mod prompt;

// RSS / Atom feed reader
pub mod rss;

/// Everything an executor may read
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    pub node_id: &'a str,
    /// Merged predecessor outputs keyed by predecessor id
    pub input: &'a Value,
    /// Predecessor ids in edge order
    pub sources: &'a [String],
    /// All outputs produced so far in the run plus the environment
    pub scope: Scope<'a>,
    pub store: &'a NodeStateStore,
    pub integrations: &'a [Integration],
    /// Results stored on nodes by earlier runs, keyed by node id
    pub previous_results: &'a HashMap<String, Value>,
    /// Effective timeout for external calls
    pub timeout: Duration,
}

impl<'a> NodeContext<'a> {
    pub fn render(&self, text: &str) -> Result<String, NodeError> {
        Ok(template::render(text, &self.scope)?)
    }

    pub fn render_value(&self, text: &str) -> Result<Value, NodeError> {
        Ok(template::render_value(text, &self.scope)?)
    }

    /// The sole predecessor's output, or the merged input when there are several
    pub fn primary_input(&self) -> Value {
        match self.sources {
            [single] => self.input.get(single).cloned().unwrap_or(Value::Null),
            _ => self.input.clone(),
        }
    }

    /// Evaluate an optional path against the primary input
    ///
    /// A missing or blank path selects the primary input itself.
    pub fn select(&self, path: Option<&str>) -> Result<Option<Value>, NodeError> {
        let source = self.primary_input();
        match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => Ok(PathExpr::parse(path)?.evaluate(&source)),
            None => Ok(Some(source)),
        }
    }

    /// Render enabled key/value pairs, dropping entries with an empty key
    pub fn render_pairs(&self, pairs: &[KeyValue]) -> Result<Vec<(String, String)>, NodeError> {
        pairs
            .iter()
            .filter(|kv| kv.enabled && !kv.key.trim().is_empty())
            .map(|kv| Ok((self.render(kv.key.trim())?, self.render(&kv.value)?)))
            .collect()
    }
}

/// How a node's completion affects its outgoing edges
#[derive(Debug, Clone, PartialEq)]
pub enum Propagation {
    /// Every outgoing edge fires
    All,
    /// Conditional routing: `index` of the matched condition, `None` for else
    Branch { index: Option<usize>, conditions: usize },
    /// No outgoing edge fires (pending batch, paused counter)
    Suppress,
    /// Downstream runs once per payload
    Iterate(Vec<Value>),
}

/// Result of a node execution
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput {
    pub data: Value,
    pub propagation: Propagation,
    /// Environment variables to set, applied before the next dispatch
    pub variable_writes: Vec<(String, String)>,
    /// The node produced data but still counts as failed
    pub failure: Option<NodeError>,
    /// Stop the whole run after this node
    pub halt: bool,
}

impl NodeOutput {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            propagation: Propagation::All,
            variable_writes: Vec::new(),
            failure: None,
            halt: false,
        }
    }

    /// Output that is recorded but marks the node as failed
    pub fn failed(data: Value, error: NodeError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(data)
        }
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn with_variables(mut self, writes: Vec<(String, String)>) -> Self {
        self.variable_writes = writes;
        self
    }
}

#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, ctx: &NodeContext<'_>, services: &Services) -> Result<NodeOutput, NodeError>;
}

/// Resolve a variable binding against a node output
pub(crate) fn bind_variable(
    binding: Option<&VariableBinding>,
    output: &Value,
    default_path: &str,
) -> Result<Vec<(String, String)>, NodeError> {
    let Some(binding) = binding else {
        return Ok(Vec::new());
    };
    let name = binding.target_name()?;
    let path = binding.path.as_deref().unwrap_or(default_path);
    let value = PathExpr::parse(path)?
        .evaluate(output)
        .map(|v| template::stringify(&v))
        .unwrap_or_default();
    Ok(vec![(name.to_string(), value.trim().to_string())])
}

/// Treat a converted XML child (single element or repeated) as a list
pub(crate) fn as_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}

/// Lower-cased header map as a JSON object
pub(crate) fn headers_object<'h>(headers: impl Iterator<Item = (&'h String, &'h String)>) -> Value {
    let map: Map<String, Value> = headers
        .map(|(k, v)| (k.to_lowercase(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Mock services and context builders for executor unit tests

    use super::*;
    use crate::runtime::services::{
        CommandOutput, CommandRequest, CommandService, DatabaseService, DecryptService, HttpRequest,
        HttpResponse, HttpService,
    };
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[derive(Default)]
    pub struct MockHttp {
        pub responses: Mutex<Vec<HttpResponse>>,
        pub requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockHttp {
        pub fn replying(status: u16, content_type: &str, body: &str) -> Arc<Self> {
            let mock = Self::default();
            mock.responses.lock().push(HttpResponse {
                status,
                status_text: "OK".to_string(),
                headers: BTreeMap::from([("content-type".to_string(), content_type.to_string())]),
                body: body.to_string(),
            });
            Arc::new(mock)
        }
    }

    #[async_trait]
    impl HttpService for MockHttp {
        async fn request(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
            self.requests.lock().push(request);
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                anyhow::bail!("connection refused");
            }
            Ok(responses.remove(0))
        }
    }

    pub struct MockExec(pub CommandOutput);

    #[async_trait]
    impl CommandService for MockExec {
        async fn execute(&self, _request: CommandRequest) -> anyhow::Result<CommandOutput> {
            Ok(self.0.clone())
        }
    }

    pub struct MockDb;

    #[async_trait]
    impl DatabaseService for MockDb {
        fn has_connection(&self, connection_id: &str) -> bool {
            connection_id == "main"
        }

        async fn query(&self, _connection_id: &str, sql: &str, params: &[Value]) -> anyhow::Result<Vec<Value>> {
            Ok(vec![serde_json::json!({"sql": sql, "params": params})])
        }
    }

    pub struct ReverseDecrypt;

    impl DecryptService for ReverseDecrypt {
        fn decrypt(&self, ciphertext: &str) -> anyhow::Result<String> {
            Ok(ciphertext.chars().rev().collect())
        }
    }

    pub fn services(http: Arc<MockHttp>) -> Services {
        Services {
            http,
            db: Arc::new(MockDb),
            exec: Arc::new(MockExec(CommandOutput {
                stdout: "hello\n".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            })),
            decrypt: Arc::new(ReverseDecrypt),
        }
    }

    /// Owned pieces a `NodeContext` borrows from
    pub struct Fixture {
        pub input: Value,
        pub sources: Vec<String>,
        pub data: Value,
        pub env: HashMap<String, String>,
        pub store: NodeStateStore,
        pub integrations: Vec<Integration>,
        pub previous: HashMap<String, Value>,
    }

    impl Fixture {
        /// Node fed by a single predecessor `SRC` producing `output`
        pub fn from_source(output: Value) -> Self {
            let input = serde_json::json!({ "SRC": output });
            Self {
                data: input.clone(),
                input,
                sources: vec!["SRC".to_string()],
                env: HashMap::new(),
                store: NodeStateStore::new(),
                integrations: Vec::new(),
                previous: HashMap::new(),
            }
        }

        pub fn ctx(&self) -> NodeContext<'_> {
            NodeContext {
                node_id: "NODE_01",
                input: &self.input,
                sources: &self.sources,
                scope: Scope::new(&self.data, &self.env),
                store: &self.store,
                integrations: &self.integrations,
                previous_results: &self.previous,
                timeout: Duration::from_secs(5),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Fixture;
    use super::*;
    use serde_json::json;

    #[test]
    fn primary_input_is_sole_predecessor_output() {
        let fixture = Fixture::from_source(json!({"a": 1}));
        assert_eq!(fixture.ctx().primary_input(), json!({"a": 1}));
        assert_eq!(fixture.ctx().select(Some("a")).unwrap(), Some(json!(1)));
        assert_eq!(fixture.ctx().select(Some("  ")).unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn variable_binding_uses_default_path() {
        let binding = VariableBinding {
            name: VariableBinding::CREATE_NEW.to_string(),
            new_name: Some("TOKEN".to_string()),
            path: None,
        };
        let output = json!({"response": {"data": {"token": "abc"}}});
        assert_eq!(
            bind_variable(Some(&binding), &output, "response.data.token").unwrap(),
            vec![("TOKEN".to_string(), "abc".to_string())]
        );
        assert!(bind_variable(None, &output, "x").unwrap().is_empty());
    }
}
