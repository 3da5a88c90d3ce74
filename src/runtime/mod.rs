/// Runtime Execution Engine
///
/// This module provides the petgraph-based DAG execution engine for workflows.
/// It handles:
/// - Wave-by-wave dispatch of ready nodes with tokio
/// - Branch, loop and suppression semantics on edges
/// - Observable run state and persistent collector/counter values
/// - The service seams node executors call out through

// Observer hooks for run progress
pub mod callbacks;

// Core execution engine using petgraph for DAG processing
pub mod engine;

// Individual node dispatch and timeouts
pub mod executor;

// One executor per node type
pub mod nodes;

// Injected HTTP, shell, database and decryption services
pub mod services;

// Run state, execution log and persistent node state
pub mod state;

// Re-export main types
pub use callbacks::{NoopCallbacks, RunCallbacks};
pub use engine::{CancelHandle, ExecutionEngine, NodeResult, NodeRunStatus, RunRequest, RunSlot, RunSummary};
pub use executor::NodeExecutor;
pub use services::Services;
pub use state::{ExecutionSnapshot, ExecutionState, LogEntry, NodeStateStore, RunStatus};
