//! HTTP adapter for the ragbot pipeline.
//!
//! Exposes question answering, similarity search and the markdown corpus
//! over JSON, and serves the static chat page.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ErrorResponse};
pub use routes::build_router;
pub use state::AppState;

use ragbot_core::{AppConfig, AppError, AppResult};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Bind to the configured address and serve until Ctrl-C.
pub async fn serve(config: &AppConfig, state: AppState) -> AppResult<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            AppError::Config(format!(
                "Invalid server address {}:{}: {}",
                config.server.host, config.server.port, e
            ))
        })?;

    let router = build_router(state, &config.static_dir);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("ragbot listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
