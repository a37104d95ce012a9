//! HTTP API of the course advisor.
//!
//! Routes:
//! - `POST /query`: one intake turn; the final turn also runs the recommendation pipeline
//! - `POST /reset`: forget a user's conversation
//! - `POST /upload_resume`: attach a resume (PDF or text) to a conversation
//! - `POST /recommend`: run the pipeline for a query directly
//! - `GET /health`

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;


pub use error::ApiError;
pub use router::router;
pub use state::AppState;

use advisor_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Bind and serve until Ctrl-C.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> AppResult<()> {
    let bind_addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Other(format!("Failed to bind {}: {}", bind_addr, e)))?;

    tracing::info!("Course advisor listening on http://{}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Other(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
