//! Concurrent set of open local connections.
//!
//! [`ConnectionRegistry`] stores one [`ConnectionHandle`] per open
//! connection in a `HashMap` behind a [`tokio::sync::RwLock`]. Open and
//! close handlers take the write lock; fan-out takes the read lock, so
//! broadcasts to the same registry run concurrently with each other.

use std::collections::HashMap;

use axum::body::Bytes;
use tokio::sync::RwLock;

use super::{ConnectionHandle, ConnectionId};
use crate::error::RelayError;

/// Outcome of one [`ConnectionRegistry::broadcast_all`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of connections the payload was queued for.
    pub delivered: usize,
    /// Connections whose send failed and that were evicted.
    pub evicted: Vec<ConnectionId>,
}

/// Local set of currently open connections.
///
/// # Concurrency
///
/// - Membership changes are serialized by the write lock.
/// - A broadcast sees the membership as of the moment it takes the read
///   lock and delivers to exactly that set.
/// - Sends never block: a closed or full queue is a failed send, and the
///   failing entry is evicted after the read lock is released.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a newly opened connection.
    pub async fn add(&self, connection: ConnectionHandle) {
        let id = connection.id();
        let mut map = self.connections.write().await;
        if map.insert(id, connection).is_some() {
            tracing::warn!(connection_id = %id, "connection registered twice, keeping latest handle");
        }
        tracing::debug!(connection_id = %id, connections = map.len(), "connection registered");
    }

    /// Deregisters a connection by identity.
    ///
    /// Returns `true` if an entry was removed. Removing an absent id is a
    /// no-op, so a close event racing a send-failure eviction is harmless.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        let mut map = self.connections.write().await;
        let removed = map.remove(&id).is_some();
        if removed {
            tracing::debug!(connection_id = %id, connections = map.len(), "connection deregistered");
        }
        removed
    }

    /// Sends `payload` to every registered connection.
    ///
    /// A failed send is logged and evicts that connection; delivery to the
    /// remaining connections continues.
    pub async fn broadcast_all(&self, payload: Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        {
            let map = self.connections.read().await;
            for (id, connection) in map.iter() {
                match connection.send(payload.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(reason) => {
                        let err = RelayError::SendFailed {
                            connection_id: *id,
                            reason,
                        };
                        tracing::warn!(error = %err, "evicting connection");
                        report.evicted.push(*id);
                    }
                }
            }
        }

        if !report.evicted.is_empty() {
            let mut map = self.connections.write().await;
            for id in &report.evicted {
                map.remove(id);
            }
        }

        report
    }

    /// Returns `true` if the connection is registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Returns the number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connections are registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_and_remove() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::new(8);
        let id = handle.id();

        registry.add(handle).await;
        assert!(registry.contains(id).await);
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove(id).await);
        assert!(!registry.contains(id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_add_keeps_single_entry() {
        let registry = ConnectionRegistry::new();
        let (handle, mut rx) = ConnectionHandle::new(8);
        let id = handle.id();

        registry.add(handle.clone()).await;
        registry.add(handle).await;
        assert_eq!(registry.len().await, 1);

        let report = registry.broadcast_all(Bytes::from_static(b"once")).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(rx.recv().await, Some(Bytes::from_static(b"once")));
        assert!(registry.remove(id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn remove_absent_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.remove(ConnectionId::new()).await);

        let (handle, _rx) = ConnectionHandle::new(8);
        let id = handle.id();
        registry.add(handle).await;
        assert!(registry.remove(id).await);
        assert!(!registry.remove(id).await);
    }

    #[tokio::test]
    async fn membership_is_opens_minus_closes() {
        let registry = ConnectionRegistry::new();
        let mut open = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..10 {
            let (handle, rx) = ConnectionHandle::new(8);
            open.push(handle.id());
            receivers.push(rx);
            registry.add(handle).await;
        }
        let closed: Vec<_> = open.iter().copied().step_by(3).collect();
        for id in &closed {
            registry.remove(*id).await;
        }

        assert_eq!(registry.len().await, open.len() - closed.len());
        for id in &open {
            assert_eq!(registry.contains(*id).await, !closed.contains(id));
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = ConnectionHandle::new(8);
        let (b, mut rx_b) = ConnectionHandle::new(8);
        registry.add(a).await;
        registry.add(b).await;

        let report = registry.broadcast_all(Bytes::from_static(b"hello")).await;
        assert_eq!(report.delivered, 2);
        assert!(report.evicted.is_empty());

        for rx in [&mut rx_a, &mut rx_b] {
            let Some(got) = rx.recv().await else {
                panic!("expected payload");
            };
            assert_eq!(got, Bytes::from_static(b"hello"));
        }
    }

    #[tokio::test]
    async fn broadcast_skips_removed_connection() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = ConnectionHandle::new(8);
        let (b, mut rx_b) = ConnectionHandle::new(8);
        let b_id = b.id();
        registry.add(a).await;
        registry.add(b).await;
        registry.remove(b_id).await;

        let report = registry.broadcast_all(Bytes::from_static(b"only-a")).await;
        assert_eq!(report.delivered, 1);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_send_evicts_without_blocking_others() {
        let registry = ConnectionRegistry::new();
        let (dead, dead_rx) = ConnectionHandle::new(8);
        let (live, mut live_rx) = ConnectionHandle::new(8);
        let dead_id = dead.id();
        let live_id = live.id();
        registry.add(dead).await;
        registry.add(live).await;
        drop(dead_rx);

        let report = registry.broadcast_all(Bytes::from_static(b"payload")).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted, vec![dead_id]);

        let Some(got) = live_rx.recv().await else {
            panic!("live connection should still receive");
        };
        assert_eq!(got, Bytes::from_static(b"payload"));
        assert!(!registry.contains(dead_id).await);
        assert!(registry.contains(live_id).await);
    }

    #[tokio::test]
    async fn full_queue_evicts_and_closes_receiver() {
        let registry = ConnectionRegistry::new();
        let (slow, mut slow_rx) = ConnectionHandle::new(1);
        let slow_id = slow.id();
        registry.add(slow).await;

        let first = registry.broadcast_all(Bytes::from_static(b"1")).await;
        assert_eq!(first.delivered, 1);
        let second = registry.broadcast_all(Bytes::from_static(b"2")).await;
        assert_eq!(second.evicted, vec![slow_id]);
        assert!(registry.is_empty().await);

        // The queued payload drains, then the queue reports closed.
        assert_eq!(slow_rx.recv().await, Some(Bytes::from_static(b"1")));
        assert_eq!(slow_rx.recv().await, None);
    }

    #[tokio::test]
    async fn concurrent_add_remove_broadcast() {
        let registry = std::sync::Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = std::sync::Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (handle, _rx) = ConnectionHandle::new(64);
                let id = handle.id();
                registry.add(handle).await;
                registry.broadcast_all(Bytes::from_static(b"x")).await;
                registry.remove(id).await;
            }));
        }
        for task in tasks {
            assert!(task.await.is_ok());
        }
        assert!(registry.is_empty().await);
    }
}
