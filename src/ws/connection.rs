//! WebSocket connection relay loop.
//!
//! Each upgraded socket is served by two tasks. The reader publishes client
//! frames to the broker one at a time; the writer drains the outbound queue
//! to the socket. A slow publish never stalls delivery to the client. The
//! connection ends on a client close, a socket error, or eviction from the
//! registry.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::broker::Broker;
use crate::domain::{ConnectionId, ConnectionState};
use crate::relay::RelayBridge;

/// Runs the read side of a single WebSocket connection.
///
/// - Registers the connection with the bridge.
/// - Spawns the writer for the connection's outbound queue.
/// - Publishes each text or binary frame from the client while open.
/// - Deregisters the connection when either side ends.
pub async fn run_connection<B: Broker>(socket: WebSocket, bridge: Arc<RelayBridge<B>>) {
    let (id, outbound) = bridge.open().await;
    let mut state = ConnectionState::Opening.on_open();
    let (ws_tx, mut ws_rx) = socket.split();
    let mut writer = tokio::spawn(write_outbound(id, ws_tx, outbound));

    while state.is_open() {
        tokio::select! {
            biased;

            // Writer ended: evicted from the registry or the socket write failed
            _ = &mut writer => state = state.on_close(),

            // Incoming frame from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => state = state.on_close(),
                    Some(Ok(frame)) => {
                        if let Some(payload) = frame_payload(frame) {
                            // Failures are logged by the bridge; the frame is dropped.
                            let _ = bridge.publish(id, payload).await;
                        }
                    }
                    Some(Err(err)) => {
                        tracing::debug!(connection_id = %id, error = %err, "ws read failed");
                        state = state.on_close();
                    }
                }
            }
        }
    }

    writer.abort();
    bridge.close(id).await;
    tracing::debug!(connection_id = %id, ?state, "ws connection closed");
}

/// Writes every payload from the outbound queue to the socket. Sends a
/// close frame once the queue is closed by eviction.
async fn write_outbound(
    id: ConnectionId,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Bytes>,
) {
    while let Some(payload) = outbound.recv().await {
        if ws_tx.send(outbound_message(payload)).await.is_err() {
            tracing::debug!(connection_id = %id, "ws write failed");
            return;
        }
    }

    tracing::debug!(connection_id = %id, "evicted from registry, closing socket");
    let _ = ws_tx.send(Message::Close(None)).await;
}

/// Extracts the relay payload from a client frame. Control frames carry
/// none.
fn frame_payload(frame: Message) -> Option<Bytes> {
    match frame {
        Message::Text(text) => Some(Bytes::copy_from_slice(text.as_str().as_bytes())),
        Message::Binary(data) => Some(data),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
    }
}

/// Wraps a channel payload for the client: text when valid UTF-8,
/// binary otherwise.
fn outbound_message(payload: Bytes) -> Message {
    std::str::from_utf8(&payload)
        .ok()
        .map(Message::text)
        .unwrap_or_else(|| Message::Binary(payload))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_payload_is_raw_utf8() {
        let Some(payload) = frame_payload(Message::text("hello")) else {
            panic!("text frames carry a payload");
        };
        assert_eq!(payload, Bytes::from_static(b"hello"));
    }

    #[test]
    fn binary_frame_payload_is_unchanged() {
        let data = Bytes::from_static(&[0, 159, 146, 150]);
        assert_eq!(frame_payload(Message::Binary(data.clone())), Some(data));
    }

    #[test]
    fn control_frames_are_not_relayed() {
        assert!(frame_payload(Message::Ping(Bytes::new())).is_none());
        assert!(frame_payload(Message::Pong(Bytes::new())).is_none());
        assert!(frame_payload(Message::Close(None)).is_none());
    }

    #[test]
    fn utf8_payload_goes_out_as_text() {
        let Message::Text(text) = outbound_message(Bytes::from_static(b"{\"x\":1}")) else {
            panic!("expected text frame");
        };
        assert_eq!(text.as_str(), "{\"x\":1}");
    }

    #[test]
    fn non_utf8_payload_goes_out_as_binary() {
        let data = Bytes::from_static(&[0xff, 0xfe]);
        let Message::Binary(out) = outbound_message(data.clone()) else {
            panic!("expected binary frame");
        };
        assert_eq!(out, data);
    }
}
