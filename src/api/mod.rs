//! HTTP API layer: plain HTTP routes served next to the WebSocket endpoint.

pub mod handlers;

use axum::Router;

use crate::app_state::AppState;
use crate::broker::Broker;

/// Builds the router with all plain HTTP endpoints.
pub fn build_router<B: Broker>() -> Router<AppState<B>> {
    Router::new().merge(handlers::system::routes::<B>())
}
