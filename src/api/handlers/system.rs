//! System endpoints: greeting and health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;
use crate::broker::Broker;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    channel: String,
    connections: usize,
}

/// `GET /` — Plain-text greeting.
pub async fn root_handler() -> &'static str {
    "Hello from whiteboard-relay!"
}

/// `GET /health` — Service health status and local connection count.
pub async fn health_handler<B: Broker>(State(state): State<AppState<B>>) -> impl IntoResponse {
    let connections = state.bridge.registry().len().await;
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            channel: state.bridge.channel().to_string(),
            connections,
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes<B: Broker>() -> Router<AppState<B>> {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler::<B>))
}
