//! WebSocket layer: upgrade handling and the per-connection relay loop.
//!
//! The WebSocket endpoint at `/ws` relays every client frame to the broker
//! channel and writes every channel payload back to the client.

pub mod connection;
pub mod handler;
