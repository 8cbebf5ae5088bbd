//! WebSocket handler for live reload.
//!
//! Handles WebSocket connections and forwards reload events to clients.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast;

use crate::notification::ReloadEvent;
use crate::ws::Hub;

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Hub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub.subscribe()))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, mut receiver: broadcast::Receiver<ReloadEvent>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            // Forward reload events to client
            result = receiver.recv() => {
                match result {
                    Ok(event) => {
                        let Ok(msg) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if socket.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Live reload client lagged");
                    }
                }
            }
            // Handle client messages (for keepalive)
            result = socket.recv() => {
                match result {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}
