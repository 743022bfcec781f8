//! Relay error types.
//!
//! [`RelayError`] is the central error type for the relay core. Per-message
//! and per-connection failures are contained where they happen; only the
//! subscription and configuration variants escape to the process boundary.
//!
//! | Variant                | Scope                 | Fatal |
//! |------------------------|-----------------------|-------|
//! | `SendFailed`           | registry → connection | no    |
//! | `PublishFailed`        | bridge → broker       | no    |
//! | `SubscriptionFailed`   | bridge → broker       | yes   |
//! | `SubscriptionClosed`   | bridge → broker       | yes   |
//! | `Config`               | startup               | yes   |
//! | `Io`                   | HTTP listener         | yes   |

use crate::domain::ConnectionId;

/// Errors raised by the relay core and its broker collaborators.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Delivering a payload to one local connection failed.
    #[error("send to connection {connection_id} failed: {reason}")]
    SendFailed {
        /// Connection whose outbound queue rejected the payload.
        connection_id: ConnectionId,
        /// Why the queue rejected it (closed or full).
        reason: SendFailure,
    },

    /// Publishing a payload to the broker failed; the payload is dropped.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// Subscribing to the relay channel failed.
    #[error("subscription to channel failed: {0}")]
    SubscriptionFailed(String),

    /// The broker ended the inbound stream while the relay was running.
    #[error("subscription stream closed by broker")]
    SubscriptionClosed,

    /// Configuration could not be loaded or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The HTTP server failed to bind or accept.
    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reason a connection's outbound queue rejected a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The connection's writer is gone.
    Closed,
    /// The connection's writer has fallen `capacity` payloads behind.
    Full,
}

impl std::fmt::Display for SendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => f.write_str("connection closed"),
            Self::Full => f.write_str("outbound queue full"),
        }
    }
}
