/// Core workflow type definitions
///
/// Defines the graph document (nodes, edges), the environment a run reads its
/// variables from, and the strongly typed configuration of every node type.
/// All types serialize to the camelCase JSON the editor exchanges with the engine.

use crate::error::NodeError;
use crate::expression::PathExpr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A complete workflow graph
///
/// Edge order is significant: conditional nodes index their outgoing
/// branches by the order edges appear in `edges`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow identifier
    #[serde(default)]
    pub id: String,
    /// Human-readable workflow name
    #[serde(default)]
    pub name: String,
    /// Nodes in this workflow
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges connecting nodes, in insertion order
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Workflow {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Next free human-readable id for a node type (`HTTP_01`, `HTTP_02`, ...)
    pub fn next_node_id(&self, node_type: NodeType) -> String {
        let prefix = format!("{}_", node_type.id_prefix());
        let highest = self
            .nodes
            .iter()
            .filter_map(|n| n.id.strip_prefix(&prefix))
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{:02}", prefix, highest + 1)
    }
}

/// Canvas position of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Most recent payload produced by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastData {
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

impl LastData {
    pub fn now(payload: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Engine-owned result state of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    /// Last successful (or continued) output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<LastData>,
    /// Error message of the last failed execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single typed unit of work in the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique, type-prefixed identifier (e.g. "HTTP_01")
    pub id: String,
    /// Type-specific configuration, tagged by `type`
    pub config: NodeConfig,
    #[serde(default)]
    pub position: Position,
    /// Written only by the engine
    #[serde(default)]
    pub state: NodeState,
    /// A failure of this node does not fail the run and downstream still executes
    #[serde(default)]
    pub continue_on_failure: bool,
}

impl Node {
    pub fn new(id: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id: id.into(),
            config,
            position: Position::default(),
            state: NodeState::default(),
            continue_on_failure: false,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.config.node_type()
    }

    /// Static validation of the configuration
    ///
    /// Rejects what can never work (malformed path expressions, unsupported
    /// methods, zero batch sizes). Fields that are merely not filled in yet
    /// are reported at execution time instead, so half-configured nodes can
    /// still be saved.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.id.trim().is_empty() {
            return Err(NodeError::Configuration("node id must not be empty".to_string()));
        }
        self.config.validate()
    }
}

/// Available node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Http,
    Command,
    Database,
    Parser,
    Format,
    Conditional,
    Iterator,
    Collector,
    Counter,
    Test,
    Prompt,
    Rss,
}

impl NodeType {
    /// Prefix used for generated node ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            NodeType::Http => "HTTP",
            NodeType::Command => "COMMAND",
            NodeType::Database => "DATABASE",
            NodeType::Parser => "PARSER",
            NodeType::Format => "FORMAT",
            NodeType::Conditional => "CONDITIONAL",
            NodeType::Iterator => "ITERATOR",
            NodeType::Collector => "COLLECTOR",
            NodeType::Counter => "COUNTER",
            NodeType::Test => "TEST",
            NodeType::Prompt => "PROMPT",
            NodeType::Rss => "RSS",
        }
    }

    /// Node types that talk to the outside world and run under a timeout
    pub fn performs_io(&self) -> bool {
        matches!(
            self,
            NodeType::Http | NodeType::Command | NodeType::Database | NodeType::Prompt | NodeType::Rss
        )
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id_prefix().to_lowercase())
    }
}

/// Per-type node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeConfig {
    Http(HttpConfig),
    Command(CommandConfig),
    Database(DatabaseConfig),
    Parser(ParserConfig),
    Format(FormatConfig),
    Conditional(ConditionalConfig),
    Iterator(IteratorConfig),
    Collector(CollectorConfig),
    Counter(CounterConfig),
    Test(TestConfig),
    Prompt(PromptConfig),
    Rss(RssConfig),
}

impl NodeConfig {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeConfig::Http(_) => NodeType::Http,
            NodeConfig::Command(_) => NodeType::Command,
            NodeConfig::Database(_) => NodeType::Database,
            NodeConfig::Parser(_) => NodeType::Parser,
            NodeConfig::Format(_) => NodeType::Format,
            NodeConfig::Conditional(_) => NodeType::Conditional,
            NodeConfig::Iterator(_) => NodeType::Iterator,
            NodeConfig::Collector(_) => NodeType::Collector,
            NodeConfig::Counter(_) => NodeType::Counter,
            NodeConfig::Test(_) => NodeType::Test,
            NodeConfig::Prompt(_) => NodeType::Prompt,
            NodeConfig::Rss(_) => NodeType::Rss,
        }
    }

    /// Per-node timeout override in milliseconds
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            NodeConfig::Http(c) => c.timeout_ms,
            NodeConfig::Command(c) => c.timeout_ms,
            NodeConfig::Database(c) => c.timeout_ms,
            NodeConfig::Prompt(c) => c.timeout_ms,
            NodeConfig::Rss(c) => c.timeout_ms,
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        match self {
            NodeConfig::Http(c) => {
                if !HTTP_METHODS.contains(&c.method.to_uppercase().as_str()) {
                    return Err(NodeError::Configuration(format!(
                        "unsupported HTTP method: {}",
                        c.method
                    )));
                }
                validate_binding(c.variable.as_ref())
            }
            NodeConfig::Command(c) => validate_binding(c.variable.as_ref()),
            NodeConfig::Parser(c) => {
                validate_path(&c.path)?;
                validate_optional_path(c.input.as_deref())
            }
            NodeConfig::Iterator(c) => validate_optional_path(c.path.as_deref()),
            NodeConfig::Collector(c) => {
                if c.batch && c.batch_size == 0 {
                    return Err(NodeError::Configuration(
                        "batch size must be at least 1".to_string(),
                    ));
                }
                validate_optional_path(c.path.as_deref())
            }
            NodeConfig::Test(c) => {
                for assertion in &c.assertions {
                    validate_optional_path(assertion.path.as_deref())?;
                }
                Ok(())
            }
            NodeConfig::Database(_)
            | NodeConfig::Format(_)
            | NodeConfig::Conditional(_)
            | NodeConfig::Counter(_)
            | NodeConfig::Prompt(_)
            | NodeConfig::Rss(_) => Ok(()),
        }
    }
}

const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

fn validate_path(path: &str) -> Result<(), NodeError> {
    PathExpr::parse(path).map(|_| ()).map_err(NodeError::from)
}

fn validate_optional_path(path: Option<&str>) -> Result<(), NodeError> {
    match path {
        Some(path) => validate_path(path),
        None => Ok(()),
    }
}

fn validate_binding(binding: Option<&VariableBinding>) -> Result<(), NodeError> {
    match binding {
        Some(binding) => binding.target_name().map(|_| ()),
        None => Ok(()),
    }
}

/// Header, query parameter or environment entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Writes part of a node's output into an environment variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableBinding {
    /// Existing variable name, or `CREATE_NEW`
    pub name: String,
    /// Name of the variable to create when `name` is `CREATE_NEW`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    /// Path into the node output; defaults to the response body / stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl VariableBinding {
    pub const CREATE_NEW: &'static str = "CREATE_NEW";

    /// Resolve the variable name this binding writes to
    pub fn target_name(&self) -> Result<&str, NodeError> {
        let name = if self.name == Self::CREATE_NEW {
            self.new_name.as_deref().map(str::trim).unwrap_or_default()
        } else {
            self.name.trim()
        };
        if name.is_empty() {
            return Err(NodeError::Configuration(
                "variable binding has no variable name".to_string(),
            ));
        }
        if let Some(path) = &self.path {
            validate_path(path)?;
        }
        Ok(name)
    }
}

/// HTTP request node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub params: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<VariableBinding>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Shell command node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandConfig {
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub env: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<VariableBinding>,
}

/// SQL query against a named connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    #[serde(default)]
    pub connection_id: String,
    #[serde(default)]
    pub query: String,
    /// Bind parameters, each a template
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserMode {
    #[default]
    Json,
    Xml,
}

/// Extracts a sub-value from upstream data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserConfig {
    #[serde(default)]
    pub mode: ParserMode,
    #[serde(default)]
    pub path: String,
    /// Path into the run outputs selecting what to parse; defaults to the
    /// sole predecessor's output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    #[default]
    Text,
    Json,
}

/// Renders a template against the upstream outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatConfig {
    #[serde(default)]
    pub mode: FormatMode,
    #[serde(default)]
    pub template: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==", alias = "equals")]
    Eq,
    #[serde(rename = "!=", alias = "notEquals")]
    Ne,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "contains")]
    Contains,
}

/// One `if` / `else if` clause; both operands are templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: CompareOp,
    #[serde(default)]
    pub value: String,
}

/// Routes to the branch of the first condition that holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionalConfig {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IteratorMode {
    #[default]
    Input,
    Custom,
}

/// Runs its downstream region once per element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IteratorConfig {
    #[serde(default)]
    pub mode: IteratorMode,
    /// Array path into the primary input (input mode); defaults to the
    /// primary input itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Newline-separated literal items (custom mode), templated
    #[serde(default)]
    pub items: String,
}

/// Accumulates values across iterations and runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorConfig {
    /// Path into the node input; defaults to the sole predecessor's output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub make_unique: bool,
    #[serde(default)]
    pub batch: bool,
    #[serde(default)]
    pub batch_size: usize,
}

/// Lets a bounded number of executions through, then pauses its downstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    #[serde(default)]
    pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionKind {
    Status,
    Headers,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssertionOp {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    Exists,
}

/// Check against another node's last result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    pub source_node_id: String,
    #[serde(rename = "type")]
    pub kind: AssertionKind,
    /// Header name (headers) or path into the body (body)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub operator: AssertionOp,
    #[serde(default)]
    pub expected: Value,
    #[serde(default)]
    pub stop_on_failure: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

/// Completion request against a configured AI integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    #[serde(default)]
    pub integration_id: String,
    #[serde(default)]
    pub prompt: String,
    /// Overrides the integration's default model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// RSS 2.0 / Atom feed reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RssConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    /// Item field to sort by (`pubDate`, `title`, ...); feed order when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Directed link between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EdgeData>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            data: None,
        }
    }

    /// Tag this edge as the branch of the given condition index
    pub fn with_branch(mut self, branch: usize) -> Self {
        self.data.get_or_insert_with(EdgeData::default).branch = Some(branch);
        self
    }

    pub fn branch(&self) -> Option<usize> {
        self.data.as_ref().and_then(|d| d.branch)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    /// Opaque handle layout owned by the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_handlers: Option<Value>,
    /// Condition index this edge belongs to (conditional sources only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<usize>,
}

/// Named set of variables active for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
}

/// Configured AI provider account used by prompt nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: String,
    pub provider: Provider,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Encrypted key; decrypted through the decrypt service at call time
    #[serde(default)]
    pub api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_wire_format() {
        let node: Node = serde_json::from_value(json!({
            "id": "HTTP_01",
            "config": {
                "type": "http",
                "url": "https://{{$HOST}}/users",
                "headers": [{"key": "Accept", "value": "application/json"}],
                "variable": {"name": "CREATE_NEW", "newName": "TOKEN", "path": "response.data.token"}
            },
            "continueOnFailure": true
        }))
        .unwrap();

        assert_eq!(node.node_type(), NodeType::Http);
        assert!(node.continue_on_failure);
        let NodeConfig::Http(http) = &node.config else {
            panic!("expected http config");
        };
        assert_eq!(http.method, "GET");
        assert!(http.headers[0].enabled);
        assert_eq!(http.variable.as_ref().unwrap().target_name().unwrap(), "TOKEN");
        assert!(node.validate().is_ok());
    }

    #[test]
    fn next_node_id_skips_taken_numbers() {
        let workflow = Workflow {
            nodes: vec![
                Node::new("HTTP_01", NodeConfig::Counter(CounterConfig::default())),
                Node::new("HTTP_07", NodeConfig::Counter(CounterConfig::default())),
                Node::new("PARSER_02", NodeConfig::Counter(CounterConfig::default())),
            ],
            ..Default::default()
        };
        assert_eq!(workflow.next_node_id(NodeType::Http), "HTTP_08");
        assert_eq!(workflow.next_node_id(NodeType::Rss), "RSS_01");
    }

    #[test]
    fn static_validation() {
        let bad_path = Node::new(
            "PARSER_01",
            NodeConfig::Parser(ParserConfig {
                mode: ParserMode::Json,
                path: "a..b".to_string(),
                input: None,
            }),
        );
        assert!(matches!(bad_path.validate(), Err(NodeError::Evaluation(_))));

        let bad_batch = Node::new(
            "COLLECTOR_01",
            NodeConfig::Collector(CollectorConfig {
                batch: true,
                batch_size: 0,
                ..Default::default()
            }),
        );
        assert!(matches!(bad_batch.validate(), Err(NodeError::Configuration(_))));

        // an empty connection is allowed at edit time
        let unconfigured = Node::new(
            "DATABASE_01",
            NodeConfig::Database(DatabaseConfig {
                connection_id: String::new(),
                query: String::new(),
                parameters: vec![],
                timeout_ms: None,
            }),
        );
        assert!(unconfigured.validate().is_ok());
    }

    #[test]
    fn conditional_operators_use_symbols() {
        let config: ConditionalConfig = serde_json::from_value(json!({
            "conditions": [
                {"field": "{{A.n}}", "operator": ">=", "value": "3"},
                {"field": "{{A.s}}", "operator": "contains", "value": "x"}
            ]
        }))
        .unwrap();
        assert_eq!(config.conditions[0].operator, CompareOp::Ge);
        assert_eq!(config.conditions[1].operator, CompareOp::Contains);
    }
}
