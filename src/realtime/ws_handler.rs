//! WebSocket endpoint - one session per connected client

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::time::Instant;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use super::RealtimeMessage;
use crate::state::AppState;

/// Handle WebSocket upgrade request
///
/// Clients are not authenticated; every client receives every update.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let rx = state.broadcaster.subscribe();
    tracing::debug!(
        "[Realtime] Upgrade accepted ({} subscribers)",
        state.broadcaster.client_count()
    );
    ws.on_upgrade(move |socket| client_session(socket, rx))
}

/// Relay broadcast messages to one client until either side goes away
async fn client_session(socket: WebSocket, mut rx: broadcast::Receiver<RealtimeMessage>) {
    let session_id = Uuid::new_v4();
    let start_time = Instant::now();
    tracing::info!("[Realtime] Client {} connected", session_id);

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            update = rx.recv() => {
                match update {
                    Ok(message) => {
                        let text = match serde_json::to_string(&message) {
                            Ok(text) => text,
                            Err(e) => {
                                tracing::error!("[Realtime] Failed to encode update: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            tracing::debug!("[Realtime] Client {} send error: {}", session_id, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "[Realtime] Client {} lagged, {} updates skipped",
                            session_id,
                            skipped
                        );
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Clients only listen
                    }
                    Some(Err(e)) => {
                        tracing::debug!("[Realtime] Client {} read error: {}", session_id, e);
                        break;
                    }
                }
            }
        }
    }

    tracing::info!(
        "[Realtime] Client {} disconnected (duration: {}ms)",
        session_id,
        start_time.elapsed().as_millis()
    );
}
