use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::debug;

use hydrosync_reconcile::ChangeNotification;

use crate::state::AppState;

// ── WebSocket Messages ──────────────────────────────────────────

/// Payload-less event frame: `{"type":"prediction_update"}`.
#[derive(Serialize)]
struct WsEvent {
    #[serde(rename = "type")]
    msg_type: &'static str,
}

pub(crate) fn event_frame() -> String {
    serde_json::to_string(&WsEvent {
        msg_type: ChangeNotification::EVENT_NAME,
    })
    .unwrap_or_default()
}

// ── WebSocket Handler ───────────────────────────────────────────

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before anything else: events emitted earlier are not replayed.
    let mut subscription = state.bus.subscribe();
    debug!(subscribers = state.bus.subscriber_count(), "client connected");

    // Forward every notification to this client.
    let mut send_task = tokio::spawn(async move {
        let frame = event_frame();
        while subscription.recv().await.is_some() {
            if sender.send(Message::Text(frame.clone().into())).await.is_err() {
                break;
            }
        }
    });

    // Consume incoming messages (pings, close frames) but ignore content.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    // Whichever side ends first takes the other down with it.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    debug!("client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_carries_event_name_only() {
        let value: serde_json::Value = serde_json::from_str(&event_frame()).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "prediction_update" }));
    }
}
