/// Run control endpoints
///
/// Runs execute the current document snapshot. By default the run is spawned
/// and progress is observed through `/api/runs/state`; `wait: true` holds the
/// request until the run finishes and returns its summary.

use super::{api_error, ApiError, AppState};
use crate::error::EngineError;
use crate::runtime::{RunCallbacks, RunRequest, RunSummary};
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::{Environment, Integration, NodeState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Request body for starting a run
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunRequest {
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub integrations: Vec<Integration>,
    /// Respond with the summary once the run finishes
    #[serde(default)]
    pub wait: bool,
}

/// Create run routes
pub fn create_run_routes() -> Router<AppState> {
    Router::new()
        .route("/api/runs", post(start_run))
        .route("/api/runs/cancel", post(cancel_run))
        .route("/api/runs/state", get(run_state))
        .route("/api/nodes/state", delete(reset_all_node_state))
        .route("/api/nodes/{id}/state", delete(reset_node_state))
}

fn engine_error(e: EngineError) -> ApiError {
    let status = match e {
        EngineError::RunInProgress => StatusCode::CONFLICT,
        EngineError::GraphCycle { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    api_error(status, e)
}

/// POST /api/runs
async fn start_run(
    State(state): State<AppState>,
    Json(payload): Json<StartRunRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let workflow = state.document.snapshot();
    let request = RunRequest::new(workflow.clone())
        .with_environment(payload.environment.unwrap_or_default())
        .with_integrations(payload.integrations);
    let callbacks: Arc<dyn RunCallbacks> = state.document.clone();

    if payload.wait {
        let summary: RunSummary = state
            .engine
            .execute(request, &state.services, callbacks)
            .await
            .map_err(engine_error)?;
        return Ok((StatusCode::OK, Json(json!(summary))));
    }

    // claim the engine before answering so a concurrent start gets 409
    let slot = state.engine.reserve().map_err(engine_error)?;
    WorkflowGraph::new(&workflow).ensure_acyclic().map_err(engine_error)?;

    tracing::info!("▶️ Spawning run of workflow '{}'", workflow.id);
    let engine = state.engine.clone();
    let services = state.services.clone();
    tokio::spawn(async move {
        if let Err(e) = engine.execute_reserved(slot, request, &services, callbacks).await {
            tracing::error!("❌ Run could not start: {}", e);
        }
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "running" }))))
}

/// POST /api/runs/cancel
async fn cancel_run(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "cancelled": state.engine.cancel() }))
}

/// GET /api/runs/state
async fn run_state(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "execution": state.engine.state().snapshot(),
        "nodeState": state.engine.store().snapshot(),
    }))
}

/// DELETE /api/nodes/{id}/state
///
/// Clears a collector's or counter's persisted values and the node's result.
async fn reset_node_state(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    if state.document.snapshot().node(&id).is_none() {
        return Err(api_error(StatusCode::NOT_FOUND, format!("node '{}' not found", id)));
    }
    let reset = state.engine.reset_node_state(&id);
    state.document.update_node_state(&id, NodeState::default());
    tracing::info!("🧹 Reset state of node '{}'", id);
    Ok(Json(json!({ "reset": reset })))
}

/// DELETE /api/nodes/state
async fn reset_all_node_state(State(state): State<AppState>) -> Json<Value> {
    state.engine.reset_all_node_state();
    Json(json!({ "reset": true }))
}
