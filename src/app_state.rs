//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::relay::RelayBridge;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug)]
pub struct AppState<B> {
    /// Relay bridge for this process.
    pub bridge: Arc<RelayBridge<B>>,
}

// Manual impl: cloning the state must not require `B: Clone`.
impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            bridge: Arc::clone(&self.bridge),
        }
    }
}
