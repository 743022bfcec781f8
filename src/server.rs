//! Server composition: router, relay startup order, and shutdown.

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::broker::Broker;
use crate::error::RelayError;
use crate::relay::RelayBridge;
use crate::ws::handler::ws_handler;

/// Builds the full application router around `bridge`.
pub fn build_app<B: Broker>(bridge: Arc<RelayBridge<B>>) -> Router {
    Router::new()
        .merge(api::build_router::<B>())
        .route("/ws", get(ws_handler::<B>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { bridge })
}

/// Runs the relay on an already-bound listener until `shutdown` resolves
/// or the broker subscription ends.
///
/// The broker subscription is established before the first connection is
/// served.
///
/// # Errors
///
/// Returns [`RelayError::SubscriptionFailed`] if the subscription cannot be
/// established, [`RelayError::SubscriptionClosed`] if it ends while
/// serving, and [`RelayError::Io`] if the server fails.
pub async fn serve<B, S>(
    bridge: Arc<RelayBridge<B>>,
    listener: TcpListener,
    shutdown: S,
) -> Result<(), RelayError>
where
    B: Broker,
    S: Future<Output = ()> + Send + 'static,
{
    let mut inbound = bridge.start().await?;
    let app = build_app(Arc::clone(&bridge));

    let addr = listener.local_addr()?;
    tracing::info!(%addr, channel = bridge.channel(), "server listening");

    let result = tokio::select! {
        served = axum::serve(listener, app).with_graceful_shutdown(shutdown).into_future() => {
            served.map_err(RelayError::from)
        }
        relayed = &mut inbound => match relayed {
            Ok(outcome) => outcome,
            Err(join_err) => {
                tracing::error!(error = %join_err, "inbound relay task failed");
                Err(RelayError::SubscriptionClosed)
            }
        },
    };

    inbound.abort();
    match &result {
        Ok(()) => tracing::info!("server stopped"),
        Err(err) => tracing::error!(error = %err, "server stopped"),
    }
    result
}

/// Resolves on Ctrl-C, or on SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
