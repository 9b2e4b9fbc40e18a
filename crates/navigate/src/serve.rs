//! HTTP server lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use navconf::NavConfig;
use theory_engine::TheoryEngine;
use tracing::{info, warn};

use crate::api::{self, AppState};

pub async fn run(config: &NavConfig) -> Result<()> {
    info!("🎼 navigate starting");

    let engine = Arc::new(TheoryEngine::new(crate::key_params(&config.analysis)));
    let state = AppState::new(engine, config.analysis.max_upload_bytes);
    let app = api::router(state);

    let addr = config.bind.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("🎼 navigate ready on http://{}", addr);
    info!("   Health: GET http://{}/api/v1/health", addr);
    info!("   Relay:  ws://{}/ws/midi", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("SIGTERM handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
