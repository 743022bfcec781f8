//! Pub/sub broker collaborators.
//!
//! The relay core talks to its broker only through the [`Broker`] trait:
//! one inbound stream per subscribed channel and a fire-and-report
//! `publish`. [`RedisBroker`] is the production implementation;
//! [`MemoryBroker`] keeps everything inside one process.

pub mod memory_broker;
pub mod redis_broker;

use std::future::Future;

use axum::body::Bytes;
use futures_util::Stream;

use crate::error::RelayError;

pub use self::memory_broker::MemoryBroker;
pub use self::redis_broker::RedisBroker;

/// Publish/subscribe transport shared by every relay process.
///
/// Payloads are opaque bytes. Implementations decide delivery guarantees;
/// the relay adds none of its own.
pub trait Broker: Send + Sync + 'static {
    /// Stream of payloads received on a subscribed channel. Ends only when
    /// the broker tears the subscription down.
    type Inbound: Stream<Item = Bytes> + Send + Unpin + 'static;

    /// Subscribes to `channel`. The subscription is active once this
    /// resolves.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SubscriptionFailed`] if the broker refuses or
    /// cannot be reached.
    fn subscribe(
        &self,
        channel: &str,
    ) -> impl Future<Output = Result<Self::Inbound, RelayError>> + Send;

    /// Publishes `payload` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::PublishFailed`] if the broker cannot accept
    /// the payload.
    fn publish(
        &self,
        channel: &str,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;
}
