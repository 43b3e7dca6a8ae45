//! Liveness endpoint for process supervisors.
//!
//! Runs independently of the Telegram session and answers even while the
//! bot is still connecting or after it has failed.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tracing::info;

/// Builds the router exposing `GET /health`.
pub fn router() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Binds `addr` and serves the health router until the process exits.
pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Health endpoint listening on http://{}/health", listener.local_addr()?);
    axum::serve(listener, router()).await
}
