//! WebSocket signaling endpoint
//!
//! One socket per peer. Inbound frames are tagged JSON commands handed to
//! the session service; outbound events arrive on the peer's queue and are
//! written by a dedicated task so a slow reader never blocks fan-out from
//! other peers.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use tandem_core::logging::generate_trace_id;
use tandem_core::models::PeerId;

use crate::http::AppState;

/// GET /ws — upgrade to the signaling channel
pub async fn websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Signaling frames are small; 64KB is generous (default is 64MB).
    ws.max_message_size(64 * 1024)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let peer_id = PeerId::new();
    let trace_id = generate_trace_id();
    let (_peer, mut events) = state.service.register_peer(peer_id.clone());

    info!(peer_id = %peer_id, trace_id = %trace_id, "websocket connected");

    let (mut sink, mut stream) = socket.split();

    // Server events -> socket
    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    error!(error = %err, "event serialization failed");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Socket frames -> commands
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => state.service.handle_text(&peer_id, &text).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong/binary are ignored
            Err(err) => {
                debug!(peer_id = %peer_id, error = %err, "websocket read error");
                break;
            }
        }
    }

    state.service.destroy_peer(&peer_id).await;
    writer.abort();

    info!(peer_id = %peer_id, trace_id = %trace_id, "websocket closed");
}
