//! List routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::routes::auth::AuthUser;
use crate::routes::error::ApiError;
use crate::services::list::{self, ListRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateListBody {
    pub board_id: i64,
    pub title: String,
}

/// Rename only. Unknown fields (notably `position`) are rejected: positions
/// change through the move endpoint alone.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateListBody {
    pub title: String,
}

#[derive(Deserialize)]
pub struct MoveListBody {
    pub position: i32,
}

#[derive(Debug, Serialize)]
pub struct ListMoveResponse {
    pub id: i64,
    pub board_id: i64,
    pub old_position: i32,
    pub new_position: i32,
}

/// `POST /api/lists` — append a list to a board.
pub async fn create_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateListBody>,
) -> Result<(StatusCode, Json<ListRow>), ApiError> {
    let row = list::create_list(&state, auth.principal.user_id, body.board_id, &body.title).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PATCH /api/lists/:id` — rename a list.
pub async fn update_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(list_id): Path<i64>,
    Json(body): Json<UpdateListBody>,
) -> Result<Json<ListRow>, ApiError> {
    let row = list::update_list(&state, auth.principal.user_id, list_id, &body.title).await?;
    Ok(Json(row))
}

/// `PUT /api/lists/:id/move` — reorder a list within its board.
pub async fn move_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(list_id): Path<i64>,
    Json(body): Json<MoveListBody>,
) -> Result<Json<ListMoveResponse>, ApiError> {
    let plan = list::move_list(&state, auth.principal.user_id, list_id, body.position).await?;
    Ok(Json(ListMoveResponse {
        id: list_id,
        board_id: plan.to.parent_id,
        old_position: plan.from.position,
        new_position: plan.to.position,
    }))
}

/// `DELETE /api/lists/:id` — remove a list and its cards.
pub async fn delete_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(list_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    list::delete_list(&state, auth.principal.user_id, list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
