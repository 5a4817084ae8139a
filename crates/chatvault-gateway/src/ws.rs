// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket event feed.
//!
//! Server -> client: every archiver event, JSON-framed with a `type` tag:
//! ```json
//! {"type": "new_message", "chat_id": -1001, "message_id": 42, ...}
//! {"type": "task_completed", "task_id": "...", "status": "completed"}
//! ```
//!
//! Client -> server: `{"type": "ping"}` is answered with `{"type": "pong"}`
//! on the same socket; everything else is ignored.
//!
//! Auth happens during the handshake via a `token` query parameter, since
//! browser WebSocket clients cannot set an `Authorization` header. A client
//! that falls behind the event feed is disconnected rather than served a
//! gap silently.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chatvault_core::Event;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WsIncoming {
    #[serde(rename = "type")]
    kind: String,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<GatewayState>,
) -> Response {
    if !state.auth.check_token(params.token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Pump one client: a forwarder task drains an outbound channel into the
/// socket, a feed task copies bus events into that channel, and the main
/// loop reads client frames until close.
async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let forwarder = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut events = state.bus.subscribe();
    let feed_tx = tx.clone();
    let feed = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let frame = match serde_json::to_string(&event) {
                        Ok(f) => f,
                        Err(e) => {
                            tracing::error!(error = %e, "event serialization failed");
                            continue;
                        }
                    };
                    if feed_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket client lagged, disconnecting");
                    break;
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let text_str: &str = &text;
                let incoming: WsIncoming = match serde_json::from_str(text_str) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!("invalid websocket frame: {e}");
                        continue;
                    }
                };
                if incoming.kind == "ping" {
                    let pong = match serde_json::to_string(&Event::Pong) {
                        Ok(f) => f,
                        Err(_) => continue,
                    };
                    if tx.send(pong).await.is_err() {
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {} // binary and control frames are ignored
        }
    }

    feed.abort();
    forwarder.abort();
}
