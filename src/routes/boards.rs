//! Board routes — creation and the ordered snapshot clients load before
//! subscribing to live events.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::routes::auth::AuthUser;
use crate::routes::error::ApiError;
use crate::services::board::{self, BoardRow, BoardSnapshot};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateBoardBody {
    pub title: String,
}

/// `GET /api/boards` — boards the caller owns or has joined.
pub async fn list_boards(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<BoardRow>>, ApiError> {
    let rows = board::boards_for_user(&state.pool, auth.principal.user_id).await?;
    Ok(Json(rows))
}

/// `POST /api/boards` — create a board owned by the caller.
pub async fn create_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateBoardBody>,
) -> Result<(StatusCode, Json<BoardRow>), ApiError> {
    let row = board::create_board(&state.pool, auth.principal.user_id, &body.title).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/boards/:id` — lists and cards in position order.
pub async fn get_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<i64>,
) -> Result<Json<BoardSnapshot>, ApiError> {
    let snapshot = board::snapshot(&state, auth.principal.user_id, board_id).await?;
    Ok(Json(snapshot))
}
