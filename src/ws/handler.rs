//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ArenaEvent, ArenaHandle};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::ClientMsg;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "Player connected");

    let (ws_sink, ws_stream) = socket.split();

    // Register before reading so this connection sees every broadcast
    let outbox = state.hub.register(conn_id);
    let rate_limiter = state.config.input_rate_limit.map(ConnectionRateLimiter::new);

    run_session(conn_id, ws_sink, ws_stream, outbox, &state.arena, rate_limiter).await;

    // Cleanup on disconnect: stop delivery first so playerLeft goes to the rest
    state.hub.unregister(&conn_id);
    if state
        .arena
        .send(ArenaEvent::Disconnect { conn_id })
        .await
        .is_err()
    {
        debug!(conn_id = %conn_id, "Arena stopped before disconnect was delivered");
    }

    info!(conn_id = %conn_id, "Player disconnected");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    conn_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut outbox: mpsc::Receiver<Arc<str>>,
    arena: &ArenaHandle,
    rate_limiter: Option<ConnectionRateLimiter>,
) {
    // Spawn writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
                debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let Some(event) = route_frame(conn_id, &text, rate_limiter.as_ref()) else {
                    continue;
                };

                if arena.send(event).await.is_err() {
                    debug!(conn_id = %conn_id, "Arena channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Turn one text frame into an arena event.
///
/// Only input frames count against the optional limiter; joins always pass.
fn route_frame(
    conn_id: Uuid,
    text: &str,
    rate_limiter: Option<&ConnectionRateLimiter>,
) -> Option<ArenaEvent> {
    match serde_json::from_str::<ClientMsg>(text) {
        Ok(ClientMsg::Join(name)) => Some(ArenaEvent::Join { conn_id, name }),
        Ok(ClientMsg::Input(command)) => {
            if rate_limiter.is_some_and(|limiter| !limiter.check_input()) {
                warn!(conn_id = %conn_id, "Rate limited input frame");
                return None;
            }
            Some(ArenaEvent::Input { conn_id, command })
        }
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
            None
        }
    }
}
