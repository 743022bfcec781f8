//! # whiteboard-relay
//!
//! WebSocket relay that fans client messages out across any number of
//! server processes through a shared pub/sub channel.
//!
//! Every message a client sends is published to the channel; every
//! message on the channel is delivered to every client connected to every
//! process, the sender included.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)
//!     │
//!     ├── WS Handler (ws/)          HTTP routes (api/)
//!     │
//!     ├── RelayBridge (relay/)
//!     │       │
//!     │       ├── ConnectionRegistry (domain/)
//!     │       │
//!     │       └── Broker (broker/)
//!     │
//!     └── Redis PUBLISH / SUBSCRIBE
//! ```

pub mod api;
pub mod app_state;
pub mod broker;
pub mod config;
pub mod domain;
pub mod error;
pub mod relay;
pub mod server;
pub mod ws;
