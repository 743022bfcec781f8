//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::broker::Broker;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
pub async fn ws_handler<B: Broker>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<B>>,
) -> impl IntoResponse {
    let bridge = Arc::clone(&state.bridge);

    ws.on_upgrade(move |socket| run_connection(socket, bridge))
}
