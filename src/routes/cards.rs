//! Card routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::routes::auth::AuthUser;
use crate::routes::error::ApiError;
use crate::services::card::{self, CardPatch, CardRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateCardBody {
    pub list_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Text edits only. Unknown fields (notably `position`) are rejected:
/// positions change through the move endpoint alone.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCardBody {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct MoveCardBody {
    pub list_id: i64,
    pub position: i32,
}

#[derive(Debug, Serialize)]
pub struct CardMoveResponse {
    pub id: i64,
    pub old_list_id: i64,
    pub new_list_id: i64,
    pub old_position: i32,
    pub new_position: i32,
}

/// `POST /api/cards` — append a card to a list.
pub async fn create_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateCardBody>,
) -> Result<(StatusCode, Json<CardRow>), ApiError> {
    let row = card::create_card(&state, auth.principal.user_id, body.list_id, &body.title, &body.description).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PATCH /api/cards/:id` — edit a card's title and/or description.
pub async fn update_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(card_id): Path<i64>,
    Json(body): Json<UpdateCardBody>,
) -> Result<Json<CardRow>, ApiError> {
    let patch = CardPatch { title: body.title, description: body.description };
    let row = card::update_card(&state, auth.principal.user_id, card_id, &patch).await?;
    Ok(Json(row))
}

/// `PUT /api/cards/:id/move` — move a card within or across lists.
pub async fn move_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(card_id): Path<i64>,
    Json(body): Json<MoveCardBody>,
) -> Result<Json<CardMoveResponse>, ApiError> {
    let moved = card::move_card(&state, auth.principal.user_id, card_id, body.list_id, body.position).await?;
    Ok(Json(CardMoveResponse {
        id: card_id,
        old_list_id: moved.plan.from.parent_id,
        new_list_id: moved.plan.to.parent_id,
        old_position: moved.plan.from.position,
        new_position: moved.plan.to.position,
    }))
}

/// `DELETE /api/cards/:id` — remove a card and close the gap.
pub async fn delete_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(card_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    card::delete_card(&state, auth.principal.user_id, card_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
