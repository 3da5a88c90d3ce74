/// Workflow Management Layer
///
/// This module holds the workflow graph document and everything that edits it:
/// - Type definitions (Workflow, Node, Edge, typed node configs)
/// - Petgraph-backed topology queries
/// - Undo/redo command history
/// - Lock-free live document using ArcSwap

// Core workflow type definitions
pub mod types;

// Graph Model & Topology Resolver
pub mod graph;

// Reversible graph edits
pub mod history;

// Live document shared by the API and the engine
pub mod document;

// Re-export commonly used types
pub use document::WorkflowDocument;
pub use graph::WorkflowGraph;
pub use history::{EditCommand, EditHistory};
pub use types::{Edge, Environment, Integration, Node, NodeConfig, NodeState, NodeType, Workflow};
