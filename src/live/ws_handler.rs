use std::sync::Arc;

use axum::{
    extract::{
        Extension,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::StreamExt;
use tracing::debug;

use super::subscriber::WsSubscriber;
use crate::startup::AppState;

/// `GET /ws` upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(app_state): Extension<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Runs for the lifetime of one connection. The handshake is complete by the
/// time this is called, so registering first is safe.
async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (sink, mut stream) = socket.split();
    let hub = app_state.hub;
    let id = hub.register(Arc::new(WsSubscriber::new(sink)));

    // Inbound frames are a liveness signal only.
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(subscriber = %id, "live connection error: {}", e);
                break;
            }
        }
    }

    hub.unregister(id);
}
