/// Workflow document REST API endpoints
///
/// The editor reads the live document, replaces it wholesale on load, and
/// sends individual graph edits that can be undone and redone.

use super::{api_error, ApiError, AppState};
use crate::error::EditError;
use crate::workflow::history::EditCommand;
use crate::workflow::types::Workflow;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

/// Document plus history flags, returned by every endpoint here
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub workflow: Workflow,
    pub can_undo: bool,
    pub can_redo: bool,
    /// Whether the request changed the document
    pub changed: bool,
}

/// Create workflow document routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflow", get(get_workflow).put(replace_workflow))
        .route("/api/workflow/edits", post(apply_edit))
        .route("/api/workflow/undo", post(undo))
        .route("/api/workflow/redo", post(redo))
}

fn respond(state: &AppState, changed: bool) -> Json<DocumentResponse> {
    Json(DocumentResponse {
        workflow: Workflow::clone(&state.document.snapshot()),
        can_undo: state.document.can_undo(),
        can_redo: state.document.can_redo(),
        changed,
    })
}

/// GET /api/workflow
async fn get_workflow(State(state): State<AppState>) -> Json<DocumentResponse> {
    respond(&state, false)
}

/// PUT /api/workflow
///
/// Body: a complete workflow. Every node configuration is checked first;
/// the edit history is cleared.
async fn replace_workflow(
    State(state): State<AppState>,
    Json(workflow): Json<Workflow>,
) -> Result<Json<DocumentResponse>, ApiError> {
    for node in &workflow.nodes {
        node.validate().map_err(|e| {
            api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                EditError::InvalidNode {
                    node_id: node.id.clone(),
                    source: e,
                },
            )
        })?;
    }

    tracing::info!(
        "📥 Loading workflow '{}' ({} nodes, {} edges)",
        workflow.id,
        workflow.nodes.len(),
        workflow.edges.len()
    );
    state.document.replace(workflow);
    Ok(respond(&state, true))
}

/// POST /api/workflow/edits
///
/// Body: `{ "action": "addNode", "node": {...} }` and the other edit commands
async fn apply_edit(
    State(state): State<AppState>,
    Json(command): Json<EditCommand>,
) -> Result<Json<DocumentResponse>, ApiError> {
    state.document.apply(command).map_err(|e| {
        let status = match e {
            EditError::NodeNotFound(_) | EditError::EdgeNotFound(_) => StatusCode::NOT_FOUND,
            EditError::DuplicateNode(_) | EditError::DuplicateEdge(_) => StatusCode::CONFLICT,
            EditError::DanglingEdge { .. } | EditError::InvalidNode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        tracing::warn!("⚠️ Rejected edit: {}", e);
        api_error(status, e)
    })?;
    Ok(respond(&state, true))
}

/// POST /api/workflow/undo
async fn undo(State(state): State<AppState>) -> Json<DocumentResponse> {
    let changed = state.document.undo();
    respond(&state, changed)
}

/// POST /api/workflow/redo
async fn redo(State(state): State<AppState>) -> Json<DocumentResponse> {
    let changed = state.document.redo();
    respond(&state, changed)
}
