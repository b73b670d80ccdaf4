//! Lobby websocket.
//!
//! `/ws/games` upgrades to a websocket and hands the connection to the game
//! relay. The connection task multiplexes two directions:
//!
//! - events queued for this connection in the registry (broadcasts and the
//!   answers to its own requests) go out as JSON text frames;
//! - client text frames are parsed as [`ClientEvent`] and dispatched to the
//!   relay.
//!
//! Unknown or malformed frames are logged and ignored.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use cardroom_core::registry::ConnectionId;
use cardroom_types::event::ClientEvent;

use crate::state::{AppState, ConcreteGameRelay};

/// Upgrade an HTTP request to a lobby websocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let relay = state.relay.clone();
    let mut connection = relay.on_connect();
    let connection_id = connection.id;

    loop {
        tokio::select! {
            event = connection.events.recv() => {
                let Some(event) = event else {
                    // Unregistered elsewhere.
                    break;
                };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(event = event.name(), "Failed to serialize ServerEvent: {err}");
                    }
                }
            }

            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&relay, &connection_id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(%connection_id, "WebSocket receive error: {err}");
                        break;
                    }
                    // Binary, ping and pong protocol frames.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    relay.on_disconnect(&connection_id);
}

/// Parse and dispatch one client text frame.
async fn handle_frame(relay: &ConcreteGameRelay, connection_id: &ConnectionId, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(
                %connection_id,
                raw = %text,
                error = %err,
                "Ignoring malformed websocket frame"
            );
            return;
        }
    };

    if let Err(err) = relay.on_client_event(connection_id, event).await {
        tracing::warn!(%connection_id, error = %err, "Failed to answer client event");
    }
}
