//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! REST endpoints perform board mutations through the Mutation Service; the
//! websocket endpoint only subscribes a client to a board's event stream.
//! Clients never mutate over the socket, so every change reaches viewers
//! through exactly one path: commit, then publish.

pub mod auth;
pub mod boards;
pub mod cards;
pub mod error;
pub mod lists;
pub mod ws;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, patch, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/boards", get(boards::list_boards).post(boards::create_board))
        .route("/api/boards/{id}", get(boards::get_board))
        .route("/api/lists", post(lists::create_list))
        .route("/api/lists/{id}/move", put(lists::move_list))
        .route("/api/lists/{id}", patch(lists::update_list).delete(lists::delete_list))
        .route("/api/cards", post(cards::create_card))
        .route("/api/cards/{id}/move", put(cards::move_card))
        .route("/api/cards/{id}", patch(cards::update_card).delete(cards::delete_card))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Liveness plus the number of boards with live viewers.
async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true, "boards": state.hub.board_count().await }))
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
