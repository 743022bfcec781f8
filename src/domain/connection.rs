//! Registry-side handle for one open connection.
//!
//! A [`ConnectionHandle`] pairs a [`ConnectionId`] with the sending half of
//! a bounded outbound queue. The connection's own task owns the receiving
//! half and writes whatever arrives to the socket. Dropping every handle
//! closes the queue, which the writer treats as a close signal.

use axum::body::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::ConnectionId;
use crate::error::SendFailure;

/// Lifecycle of a single connection: `Opening → Open → Closed`.
///
/// `Open` loops on itself for each message; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket upgraded, not yet registered.
    Opening,
    /// Registered and relaying.
    Open,
    /// Deregistered. A closed handle is never re-opened.
    Closed,
}

impl ConnectionState {
    /// Returns the state after the open event.
    #[must_use]
    pub const fn on_open(self) -> Self {
        match self {
            Self::Opening | Self::Open => Self::Open,
            Self::Closed => Self::Closed,
        }
    }

    /// Returns the state after a close event or fatal send error.
    #[must_use]
    pub const fn on_close(self) -> Self {
        Self::Closed
    }

    /// Returns `true` while the connection may relay messages.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Send capability and identity of one local connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Bytes>,
}

impl ConnectionHandle {
    /// Creates a handle with a fresh identity and an outbound queue of
    /// `capacity` payloads. Returns the handle and the queue's receiver.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    /// Returns this connection's identity.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues `payload` for delivery without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SendFailure::Closed`] when the connection's writer is gone
    /// and [`SendFailure::Full`] when its queue is at capacity.
    pub fn send(&self, payload: Bytes) -> Result<(), SendFailure> {
        self.tx.try_send(payload).map_err(|e| match e {
            TrySendError::Closed(_) => SendFailure::Closed,
            TrySendError::Full(_) => SendFailure::Full,
        })
    }
}
