//! Domain layer: connection identity, handles, and the connection registry.
//!
//! This module holds the process-local state of the relay: which
//! connections are open and how to reach each of them.

pub mod connection;
pub mod connection_id;
pub mod connection_registry;

pub use connection::{ConnectionHandle, ConnectionState};
pub use connection_id::ConnectionId;
pub use connection_registry::{BroadcastReport, ConnectionRegistry};
