//! WebSocket handler — read-only board subscription.
//!
//! DESIGN
//! ======
//! After authentication and the board access check, the socket is split:
//! - a writer task drains the connection's outbound queue and sends a
//!   periodic Ping;
//! - a reader task discards everything the client sends and watches for
//!   Close, error, or end of stream.
//!
//! Whichever half finishes first aborts the other. The hub dropping the
//! queue (slow-consumer eviction) ends the writer, so an evicted client is
//! disconnected too.
//!
//! LIFECYCLE
//! =========
//! 1. Query `board_id` + `token` → authenticate → authorize → upgrade
//! 2. Open + register a hub connection for the board
//! 3. Relay events until either half ends
//! 4. Unregister exactly once

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{error, info};

use crate::hub::Outbox;
use crate::services::access::Principal;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = params.get("token").filter(|t| !t.is_empty()) else {
        return (StatusCode::UNAUTHORIZED, "token required").into_response();
    };
    let Some(board_id) = params.get("board_id").and_then(|raw| raw.parse::<i64>().ok()) else {
        return (StatusCode::BAD_REQUEST, "board_id required").into_response();
    };

    let principal = match state.access.authenticate(token).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return (StatusCode::UNAUTHORIZED, "invalid or expired token").into_response(),
        Err(e) => {
            error!(error = %e, "ws token validation failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "token validation error").into_response();
        }
    };

    match state.access.may_access_board(principal.user_id, board_id).await {
        Ok(true) => {}
        Ok(false) => return (StatusCode::FORBIDDEN, "board access denied").into_response(),
        Err(e) => {
            error!(error = %e, %board_id, "ws board access check failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "access check error").into_response();
        }
    }

    ws.on_upgrade(move |socket| run_ws(socket, state, board_id, principal))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(socket: WebSocket, state: AppState, board_id: i64, principal: Principal) {
    let user_id = principal.user_id;
    let (conn, outbox) = state.hub.open(board_id, user_id);
    let connection_id = conn.id();
    state.hub.register(conn).await;
    let viewers = state.hub.subscriber_count(board_id).await;
    info!(%connection_id, %board_id, %user_id, username = %principal.username, viewers, "ws: client connected");

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(sink, outbox, state.hub.config().ping_interval));
    let mut reader = tokio::spawn(read_loop(stream));

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    state.hub.unregister(board_id, connection_id).await;
    info!(%connection_id, %board_id, "ws: client disconnected");
}

/// Forward queued events and keep-alive pings until the queue closes or the
/// socket fails.
async fn write_loop(mut sink: SplitSink<WebSocket, Message>, mut outbox: Outbox, ping_interval: Duration) {
    let mut ping = tokio::time::interval(ping_interval);
    // The first tick completes immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            next = outbox.next() => {
                let Some(text) = next else {
                    // Evicted or hub gone.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Clients do not send application messages; anything received is dropped.
async fn read_loop(mut stream: SplitStream<WebSocket>) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
