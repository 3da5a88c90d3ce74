/// nodeflow server assembly
///
/// Builds the execution engine, the live workflow document and the default
/// services, then serves the editor API over them.

use crate::{
    api::{create_routes, AppState},
    config::Config,
    runtime::{ExecutionEngine, NodeExecutor},
    services::default_services,
    workflow::{types::Workflow, WorkflowDocument},
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Build the router with a fresh document and engine
pub async fn create_app(config: Config) -> Result<Router> {
    // Ensure data directory exists
    tracing::info!("📁 Ensuring data directory exists: {}", config.storage.data_dir);
    std::fs::create_dir_all(&config.storage.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory: {}", e))?;

    tracing::info!(
        "🗄️ {} database connection(s) configured: {:?}",
        config.storage.connections.len(),
        config.storage.connections.keys().collect::<Vec<_>>()
    );

    tracing::info!("⚙️ Initializing node executor (default timeout {} ms)", config.engine.node_timeout_ms);
    let node_executor = Arc::new(NodeExecutor::new(Duration::from_millis(config.engine.node_timeout_ms)));

    tracing::info!("🚀 Initializing execution engine");
    let execution_engine = Arc::new(ExecutionEngine::new(node_executor));

    tracing::info!("📊 Initializing workflow document (history limit {})", config.engine.history_limit);
    let document = Arc::new(WorkflowDocument::new(Workflow::default(), config.engine.history_limit));

    let state = AppState {
        engine: execution_engine,
        document,
        services: default_services(&config),
    };

    let app = build_router(state);
    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Router over an already assembled state
pub fn build_router(state: AppState) -> Router {
    tracing::info!("📡 Creating HTTP router with all endpoints");
    Router::new()
        .route("/healthz", get(health_check))
        .merge(create_routes().with_state(state))
}

/// Install logging, then serve until the listener fails
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging; RUST_LOG overrides the level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting nodeflow server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}
