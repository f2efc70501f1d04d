// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint carrying the signaling protocol.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "initiate_call", "call_id": "...", "recipient_id": "bob"}
//! {"type": "send_offer", "call_id": "...", "target_user_id": "bob", "payload": {"sdp": "..."}}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "connected", "user_id": "alice", "connection_id": "..."}
//! {"type": "call_error", "call_id": "...", "code": "forbidden", "message": "..."}
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};

use ringline_core::{RinglineError, ServerEvent};
use ringline_signaling::{ClientCommand, dispatch};

use crate::auth::{WsParams, authorize_ws};
use crate::server::GatewayState;

/// WebSocket upgrade handler. Authentication happens before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<GatewayState>,
) -> Response {
    match authorize_ws(&state.auth, &params) {
        Ok(user_id) => ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)),
        Err(status) => status.into_response(),
    }
}

/// Handle one connection: a sender task drains the outbound queue while
/// this task reads commands. Commands from one connection run in order.
async fn handle_socket(socket: WebSocket, state: GatewayState, user_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    let mut rx = state.transport.register(&connection_id);
    let sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(event = event.kind(), error = %e, "failed to encode event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let lease = state.lifecycle.on_connect(&user_id, &connection_id).await;

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let text_str: &str = &text;
                match serde_json::from_str::<ClientCommand>(text_str) {
                    Ok(command) => run_command(&state, &user_id, &connection_id, command).await,
                    Err(e) => {
                        tracing::debug!(user_id, connection_id, "invalid WebSocket message: {e}");
                        let err = RinglineError::InvalidRequest(format!("malformed command: {e}"));
                        reply(&state, &connection_id, ServerEvent::error(None, &err)).await;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {} // Ignore binary, ping (handled by tungstenite layer)
        }
    }

    state.transport.unregister(&connection_id);
    sender_task.abort();
    state.lifecycle.on_disconnect(&user_id, lease.generation).await;
}

/// Execute one command in its own task so a panic is contained to that
/// command. Failures go back to the sender as `call_error`.
async fn run_command(state: &GatewayState, user_id: &str, connection_id: &str, command: ClientCommand) {
    let call_id = command.call_id().map(str::to_string);
    let kind = command.kind();
    let relay = state.relay.clone();
    let actor = user_id.to_string();

    let result = tokio::spawn(async move { dispatch(&relay, &actor, command).await }).await;
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(join_err) => {
            tracing::error!(user_id, command = kind, error = %join_err, "command task failed");
            Err(RinglineError::Internal(format!("{kind} failed")))
        }
    };

    match outcome {
        Ok(Some(event)) => reply(state, connection_id, event).await,
        Ok(None) => {}
        Err(err) => {
            tracing::debug!(user_id, command = kind, code = err.code(), error = %err, "command rejected");
            reply(state, connection_id, ServerEvent::error(call_id.as_deref(), &err)).await;
        }
    }
}

async fn reply(state: &GatewayState, connection_id: &str, event: ServerEvent) {
    state
        .relay
        .notifier()
        .send_to_connection(connection_id, &event)
        .await;
}
