/// HTTP API Layer
///
/// This module provides the REST API the editor talks to. It handles:
/// - Reading and replacing the live workflow document
/// - Graph edits with undo/redo
/// - Starting, observing and cancelling runs
/// - Resetting persistent collector/counter state

use crate::runtime::{ExecutionEngine, Services};
use crate::workflow::WorkflowDocument;
use axum::{http::StatusCode, response::Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

// Workflow document and edit endpoints
pub mod workflow;

// Run control and observation endpoints
pub mod runs;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Execution engine; one run at a time
    pub engine: Arc<ExecutionEngine>,
    /// Live workflow document, also the run's callback sink
    pub document: Arc<WorkflowDocument>,
    /// Services handed to every run
    pub services: Services,
}

/// Error response: status plus `{ "error": message }`
pub type ApiError = (StatusCode, Json<Value>);

pub(crate) fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

/// All API routes, without state
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(workflow::create_workflow_routes())
        .merge(runs::create_run_routes())
}
