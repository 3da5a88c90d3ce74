/// nodeflow: execution engine for visually composed workflow graphs
///
/// Main entry point for the nodeflow server. Initializes configuration and starts
/// the HTTP server with workflow editing and run control.

use nodeflow::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Workflow document and edits at /api/workflow/*
/// - Run control at /api/runs/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults to 0.0.0.0:3004, NODEFLOW_* overrides)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
