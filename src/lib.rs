/// nodeflow: execution engine for visually composed workflow graphs
///
/// This library provides the workflow document with undo/redo, the
/// petgraph-based run engine with branching, looping and batching nodes,
/// and an axum API for driving it from an editor.

// Core configuration and setup
pub mod config;

// Run-level and node-level error types
pub mod error;

// Path queries, template rendering and XML conversion
pub mod expression;

// Workflow management layer - document, graph topology, edit history
pub mod workflow;

// Runtime execution engine - petgraph DAG execution and node orchestration
pub mod runtime;

// Default HTTP, shell, SQLite and decryption services
pub mod services;

// HTTP API layer - REST endpoints for the editor
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{EditError, EngineError, NodeError};
pub use runtime::{ExecutionEngine, NodeExecutor, RunCallbacks, RunRequest, RunSummary, Services};
pub use server::start_server;
pub use workflow::{Edge, Node, NodeConfig, NodeType, Workflow, WorkflowDocument};
