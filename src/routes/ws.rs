//! WebSocket handler: asset change feed.
//!
//! DESIGN
//! ======
//! The handler subscribes to the cache before the upgrade completes, so no
//! event between the HTTP request and the first frame is lost. The feed is
//! one-way: client frames other than close are ignored.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `assets:connected` with `client_id`
//! 2. Each `AssetEvent` → `assets:updated` / `assets:reset`
//! 3. Subscriber fell behind → `assets:resync` (client re-resolves everything)
//! 4. Close or send failure → drop the subscription

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assets::AssetEvent;
use crate::state::AppState;

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let events = state.cache.subscribe();
    ws.on_upgrade(move |socket| run_ws(socket, events))
}

// =============================================================================
// MESSAGES
// =============================================================================

pub(crate) fn connected_message(client_id: Uuid) -> Value {
    json!({ "type": "assets:connected", "client_id": client_id })
}

pub(crate) fn event_message(event: &AssetEvent) -> Value {
    match event {
        AssetEvent::Updated { key } => json!({ "type": "assets:updated", "key": key }),
        AssetEvent::Reset => json!({ "type": "assets:reset" }),
    }
}

pub(crate) fn resync_message(missed: u64) -> Value {
    json!({ "type": "assets:resync", "missed": missed })
}

async fn send_json(socket: &mut WebSocket, value: &Value) -> bool {
    socket.send(Message::Text(value.to_string().into())).await.is_ok()
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, mut events: broadcast::Receiver<AssetEvent>) {
    let client_id = Uuid::new_v4();
    if !send_json(&mut socket, &connected_message(client_id)).await {
        return;
    }
    info!(%client_id, "asset feed connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                let message = match event {
                    Ok(event) => event_message(&event),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(%client_id, missed, "asset feed lagged; requesting resync");
                        resync_message(missed)
                    }
                    Err(RecvError::Closed) => break,
                };
                if !send_json(&mut socket, &message).await {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!(%client_id, "asset feed disconnected");
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
