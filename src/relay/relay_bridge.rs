//! Bridge between local connections and the broker channel.
//!
//! Two flows run concurrently:
//!
//! - **Inbound**: one task drains the broker subscription and fans every
//!   payload out to the [`ConnectionRegistry`], unchanged.
//! - **Outbound**: each connection task calls [`RelayBridge::open`],
//!   [`RelayBridge::publish`] per message, and [`RelayBridge::close`].
//!
//! A sender is not excluded from its own broadcast: its message comes back
//! through the broker like everyone else's.

use std::sync::Arc;

use axum::body::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::broker::Broker;
use crate::domain::{ConnectionHandle, ConnectionId, ConnectionRegistry};
use crate::error::RelayError;

/// Relays payloads between the local [`ConnectionRegistry`] and one broker
/// channel.
#[derive(Debug)]
pub struct RelayBridge<B> {
    broker: B,
    registry: Arc<ConnectionRegistry>,
    channel: String,
    connection_buffer: usize,
}

impl<B: Broker> RelayBridge<B> {
    /// Creates a bridge over `broker` and `registry` for `channel`.
    ///
    /// `connection_buffer` is the outbound queue capacity given to each
    /// connection opened through [`RelayBridge::open`].
    #[must_use]
    pub fn new(
        broker: B,
        registry: Arc<ConnectionRegistry>,
        channel: impl Into<String>,
        connection_buffer: usize,
    ) -> Self {
        Self {
            broker,
            registry,
            channel: channel.into(),
            connection_buffer,
        }
    }

    /// Returns the relay channel name.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Returns the local connection registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Subscribes to the relay channel and spawns the inbound fan-out task.
    ///
    /// The subscription is active when this returns, so connections
    /// accepted afterwards cannot miss a message published after they
    /// open. The returned task resolves only if the subscription ends.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SubscriptionFailed`] if the broker subscription
    /// cannot be established.
    pub async fn start(self: &Arc<Self>) -> Result<JoinHandle<Result<(), RelayError>>, RelayError> {
        let inbound = self.subscribe().await?;
        let bridge = Arc::clone(self);
        Ok(tokio::spawn(async move { bridge.run_inbound(inbound).await }))
    }

    /// Subscribes to the relay channel.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SubscriptionFailed`] if the broker subscription
    /// cannot be established.
    pub async fn subscribe(&self) -> Result<B::Inbound, RelayError> {
        match self.broker.subscribe(&self.channel).await {
            Ok(inbound) => Ok(inbound),
            Err(err @ RelayError::SubscriptionFailed(_)) => {
                tracing::error!(channel = %self.channel, error = %err, "subscription failed");
                Err(err)
            }
            Err(other) => {
                tracing::error!(channel = %self.channel, error = %other, "subscription failed");
                Err(RelayError::SubscriptionFailed(other.to_string()))
            }
        }
    }

    /// Fans every payload from `inbound` out to the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SubscriptionClosed`] when the broker ends the
    /// stream. Cancel the future to stop relaying on shutdown.
    pub async fn run_inbound(&self, mut inbound: B::Inbound) -> Result<(), RelayError> {
        while let Some(payload) = inbound.next().await {
            let size = payload.len();
            let report = self.registry.broadcast_all(payload).await;
            tracing::debug!(
                channel = %self.channel,
                size,
                delivered = report.delivered,
                evicted = report.evicted.len(),
                "retransmit"
            );
        }

        tracing::error!(channel = %self.channel, "subscription stream ended");
        Err(RelayError::SubscriptionClosed)
    }

    /// Registers a new local connection.
    ///
    /// Returns its identity and the receiver of its outbound queue. The
    /// registry holds the only sender, so the receiver yields `None` once
    /// the connection is closed or evicted.
    pub async fn open(&self) -> (ConnectionId, mpsc::Receiver<Bytes>) {
        let (handle, rx) = ConnectionHandle::new(self.connection_buffer);
        let id = handle.id();
        self.registry.add(handle).await;
        tracing::info!(connection_id = %id, "connection opened");
        (id, rx)
    }

    /// Publishes a payload received from connection `from` to the channel.
    ///
    /// The payload is passed through unmodified. On failure the payload is
    /// dropped and the connection stays open.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::PublishFailed`] if the broker rejected it.
    pub async fn publish(&self, from: ConnectionId, payload: Bytes) -> Result<(), RelayError> {
        let size = payload.len();
        match self.broker.publish(&self.channel, payload).await {
            Ok(()) => {
                tracing::trace!(connection_id = %from, size, "published");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(connection_id = %from, size, error = %err, "publish failed, message dropped");
                Err(err)
            }
        }
    }

    /// Deregisters a local connection. No-op if it was already evicted.
    pub async fn close(&self, id: ConnectionId) {
        let removed = self.registry.remove(id).await;
        tracing::info!(connection_id = %id, evicted_earlier = !removed, "connection closed");
    }
}
