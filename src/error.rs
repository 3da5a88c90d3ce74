/// Error taxonomy for the execution engine
///
/// Run-level failures (`EngineError`) abort a run before or instead of node
/// dispatch. Node-level failures (`NodeError`) are captured into the node's
/// `error` field and the execution log; the run keeps going where it can.

use thiserror::Error;

/// Fatal errors that stop a run as a whole
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// The graph has a back edge; no node was executed
    #[error("workflow graph contains a cycle through node '{node_id}'")]
    GraphCycle { node_id: String },

    /// Only one run may be active per engine
    #[error("a workflow run is already in progress")]
    RunInProgress,
}

/// Failure of a single node execution
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    /// Missing or invalid node configuration; the action was never attempted
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad template or path expression
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Network, database or process failure (timeouts included)
    #[error("external error: {0}")]
    External(String),

    /// One or more test assertions did not hold
    #[error("assertion failed: {0}")]
    Assertion(String),
}

impl NodeError {
    /// Short machine-readable kind used in log entries
    pub fn kind(&self) -> &'static str {
        match self {
            NodeError::Configuration(_) => "configuration",
            NodeError::Evaluation(_) => "evaluation",
            NodeError::External(_) => "external",
            NodeError::Assertion(_) => "assertion",
        }
    }
}

/// Invalid path expression
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid query '{path}': {reason}")]
pub struct QueryError {
    pub path: String,
    pub reason: String,
}

impl QueryError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<QueryError> for NodeError {
    fn from(err: QueryError) -> Self {
        NodeError::Evaluation(err.to_string())
    }
}

/// Malformed XML document
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid XML: {0}")]
pub struct XmlError(pub String);

impl From<XmlError> for NodeError {
    fn from(err: XmlError) -> Self {
        NodeError::Evaluation(err.to_string())
    }
}

/// Rejected graph edit
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EditError {
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    #[error("edge '{0}' not found")]
    EdgeNotFound(String),

    #[error("node '{0}' already exists")]
    DuplicateNode(String),

    #[error("edge '{0}' already exists")]
    DuplicateEdge(String),

    #[error("edge '{edge_id}' references unknown node '{node_id}'")]
    DanglingEdge { edge_id: String, node_id: String },

    #[error("invalid node '{node_id}': {source}")]
    InvalidNode {
        node_id: String,
        #[source]
        source: NodeError,
    },
}
