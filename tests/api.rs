mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::{engine, services};
use nodeflow::api::AppState;
use nodeflow::runtime::ExecutionEngine;
use nodeflow::server::build_router;
use nodeflow::workflow::{Workflow, WorkflowDocument};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    app_with(engine())
}

fn app_with(engine: Arc<ExecutionEngine>) -> Router {
    build_router(AppState {
        engine,
        document: Arc::new(WorkflowDocument::new(Workflow::default(), 20)),
        services: services(),
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

fn greeting_workflow() -> Value {
    json!({
        "id": "greet",
        "name": "Greeting",
        "nodes": [
            {"id": "FORMAT_01", "config": {"type": "format", "template": "hi"}},
            {"id": "FORMAT_02", "config": {"type": "format", "template": "{{FORMAT_01}} there"}},
        ],
        "edges": [{"id": "e1", "source": "FORMAT_01", "target": "FORMAT_02"}],
    })
}

#[tokio::test]
async fn health_check_responds_ok() {
    let (status, body) = send(&app(), Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn edits_can_be_undone_and_redone() {
    let app = app();
    let (status, _) = send(&app, Method::PUT, "/api/workflow", Some(greeting_workflow())).await;
    assert_eq!(status, StatusCode::OK);

    let add = json!({
        "action": "addNode",
        "node": {"id": "COUNTER_01", "config": {"type": "counter", "limit": 3}},
    });
    let (status, body) = send(&app, Method::POST, "/api/workflow/edits", Some(add)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflow"]["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(body["canUndo"], true);

    let (_, body) = send(&app, Method::POST, "/api/workflow/undo", None).await;
    assert_eq!(body["changed"], true);
    assert_eq!(body["workflow"]["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(body["canRedo"], true);

    let (_, body) = send(&app, Method::POST, "/api/workflow/redo", None).await;
    assert_eq!(body["workflow"]["nodes"][2]["id"], "COUNTER_01");

    let (_, body) = send(&app, Method::POST, "/api/workflow/redo", None).await;
    assert_eq!(body["changed"], false);
}

#[tokio::test]
async fn invalid_edits_are_rejected() {
    let app = app();
    send(&app, Method::PUT, "/api/workflow", Some(greeting_workflow())).await;

    let remove = json!({"action": "removeNode", "id": "NOPE"});
    let (status, body) = send(&app, Method::POST, "/api/workflow/edits", Some(remove)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("NOPE"));

    let dangling = json!({"action": "addEdge", "edge": {"id": "e9", "source": "FORMAT_01", "target": "GHOST"}});
    let (status, _) = send(&app, Method::POST, "/api/workflow/edits", Some(dangling)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let duplicate = json!({"action": "addNode", "node": {"id": "FORMAT_01", "config": {"type": "format"}}});
    let (status, _) = send(&app, Method::POST, "/api/workflow/edits", Some(duplicate)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn waited_run_returns_summary_and_updates_document() {
    let app = app();
    send(&app, Method::PUT, "/api/workflow", Some(greeting_workflow())).await;

    let (status, summary) = send(&app, Method::POST, "/api/runs", Some(json!({"wait": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["nodeResults"]["FORMAT_02"]["data"], "hi there");

    let (_, document) = send(&app, Method::GET, "/api/workflow", None).await;
    assert_eq!(document["workflow"]["nodes"][1]["state"]["result"]["payload"], "hi there");

    let (_, state) = send(&app, Method::GET, "/api/runs/state", None).await;
    assert_eq!(state["execution"]["status"], "completed");
    assert_eq!(state["execution"]["log"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn cyclic_workflow_cannot_start() {
    let app = app();
    let mut workflow = greeting_workflow();
    workflow["edges"]
        .as_array_mut()
        .unwrap()
        .push(json!({"id": "back", "source": "FORMAT_02", "target": "FORMAT_01"}));
    send(&app, Method::PUT, "/api/workflow", Some(workflow)).await;

    let (status, body) = send(&app, Method::POST, "/api/runs", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("cycle"));
}

#[tokio::test]
async fn node_state_reset_requires_existing_node() {
    let app = app();
    send(&app, Method::PUT, "/api/workflow", Some(greeting_workflow())).await;

    let (status, _) = send(&app, Method::DELETE, "/api/nodes/GHOST/state", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::DELETE, "/api/nodes/FORMAT_01/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reset"], false);
}

#[tokio::test]
async fn cancel_without_active_run_reports_false() {
    let (status, body) = send(&app(), Method::POST, "/api/runs/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn global_node_state_reset_always_succeeds() {
    let (status, body) = send(&app(), Method::DELETE, "/api/nodes/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reset"], true);
}

#[tokio::test]
async fn background_run_is_refused_while_the_engine_is_claimed() {
    let engine = engine();
    let app = app_with(engine.clone());
    send(&app, Method::PUT, "/api/workflow", Some(greeting_workflow())).await;

    let slot = engine.reserve().unwrap();
    let (status, body) = send(&app, Method::POST, "/api/runs", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("in progress"));

    drop(slot);
    let (status, body) = send(&app, Method::POST, "/api/runs", Some(json!({}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "running");
}
