//! Relay layer: the bridge between local connections and the broker.

pub mod relay_bridge;

pub use relay_bridge::RelayBridge;

/// Channel every relay process publishes to and subscribes on.
pub const DEFAULT_CHANNEL: &str = "whiteboard";
