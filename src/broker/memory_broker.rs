//! In-process broker built on [`tokio::sync::broadcast`].
//!
//! [`MemoryBroker`] keeps one broadcast channel per channel name. Every
//! subscriber receives every payload published after it subscribed, the
//! publisher included, which is the same echo behaviour Redis gives the
//! relay. Cloning the broker shares the underlying channels.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::{Mutex, broadcast};

use super::Broker;
use crate::error::RelayError;

/// Single-process pub/sub bus.
///
/// Each channel is a `tokio::broadcast` ring of `capacity` payloads. A
/// subscriber that falls a full ring behind skips the oldest payloads and
/// logs how many it missed.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Bytes>>>>,
    capacity: usize,
}

impl MemoryBroker {
    /// Creates a broker whose channels buffer `capacity` payloads.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    async fn sender(&self, channel: &str) -> broadcast::Sender<Bytes> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Broker for MemoryBroker {
    type Inbound = BoxStream<'static, Bytes>;

    async fn subscribe(&self, channel: &str) -> Result<Self::Inbound, RelayError> {
        let rx = self.sender(channel).await.subscribe();
        let channel = channel.to_string();
        let stream = futures_util::stream::unfold(rx, move |mut rx| {
            let channel = channel.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(payload) => return Some((payload, rx)),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(%channel, lagged = n, "memory broker subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(stream.boxed())
    }

    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), RelayError> {
        // Zero receivers is not an error, same as PUBLISH on Redis.
        let receivers = self.sender(channel).await.send(payload).unwrap_or(0);
        tracing::trace!(channel, receivers, "published to memory broker");
        Ok(())
    }
}
