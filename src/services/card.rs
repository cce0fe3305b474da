//! Card service — create, edit, move, delete with dense positions per list.
//!
//! DESIGN
//! ======
//! Each mutation runs inside one transaction: lock the affected list rows,
//! re-read the card under lock, apply the ordering plan, commit. Only then
//! is the event published. A move across boards is published to both
//! boards so viewers of the destination see the card arrive.
//!
//! Edits change text fields only. Position is never written through an
//! edit, so edits take no parent lock and the last committed edit wins.

use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::event::{Data, Event, EventKind, ItemKind};
use crate::ordering::{MovePlan, Placement};
use crate::services::list;
use crate::services::mutation::{MutationError, ensure_access, require_title, with_retry};
use crate::services::position;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardRow {
    pub id: i64,
    pub list_id: i64,
    pub title: String,
    pub description: String,
    pub position: i32,
}

/// Committed move of one card.
#[derive(Debug, Clone)]
pub struct CardMove {
    pub card_id: i64,
    pub source_board: i64,
    pub destination_board: i64,
    pub plan: MovePlan,
}

/// Field edits for one card. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Committed removal of one card.
#[derive(Debug, Clone, Copy)]
pub struct CardRemoval {
    pub card_id: i64,
    pub board_id: i64,
    pub at: Placement,
}

// =============================================================================
// CREATE
// =============================================================================

/// Append a card to the end of `list_id`.
///
/// # Errors
///
/// `Validation` for a blank title, `NotFound` for a missing list,
/// `Forbidden` when the caller may not edit the board.
pub async fn create_card(
    state: &AppState,
    user_id: Uuid,
    list_id: i64,
    title: &str,
    description: &str,
) -> Result<CardRow, MutationError> {
    let title = require_title(title)?;
    let (board_id, card) = with_retry(state.retry, "create_card", || {
        create_card_once(state, user_id, list_id, title, description)
    })
    .await?;

    info!(%board_id, card_id = card.id, list_id, position = card.position, "card created");
    state.hub.publish(created_event(board_id, &card)).await;
    Ok(card)
}

async fn create_card_once(
    state: &AppState,
    user_id: Uuid,
    list_id: i64,
    title: &str,
    description: &str,
) -> Result<(i64, CardRow), MutationError> {
    let board_id = list::board_of(&state.pool, list_id).await?;
    ensure_access(state.access.as_ref(), user_id, board_id).await?;

    let mut tx = state.pool.begin().await?;
    position::lock_parents(&mut tx, ItemKind::Card, &[list_id]).await?;
    let position = position::append_position(&mut tx, ItemKind::Card, list_id).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO cards (list_id, title, description, position) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(list_id)
    .bind(title)
    .bind(description)
    .bind(position)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    let card = CardRow { id, list_id, title: title.to_owned(), description: description.to_owned(), position };
    Ok((board_id, card))
}

// =============================================================================
// UPDATE
// =============================================================================

/// Edit a card's title and/or description.
///
/// # Errors
///
/// `Validation` for a blank title or an empty patch, `NotFound` for a
/// missing card, `Forbidden` when the caller may not edit the board.
pub async fn update_card(
    state: &AppState,
    user_id: Uuid,
    card_id: i64,
    patch: &CardPatch,
) -> Result<CardRow, MutationError> {
    if patch.title.is_none() && patch.description.is_none() {
        return Err(MutationError::Validation("nothing to update".into()));
    }
    let title = patch.title.as_deref().map(require_title).transpose()?;
    let description = patch.description.as_deref();

    let (board_id, card) = with_retry(state.retry, "update_card", || {
        update_card_once(state, user_id, card_id, title, description)
    })
    .await?;

    info!(%board_id, card_id, "card updated");
    state.hub.publish(updated_event(board_id, &card)).await;
    Ok(card)
}

async fn update_card_once(
    state: &AppState,
    user_id: Uuid,
    card_id: i64,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<(i64, CardRow), MutationError> {
    let (_, board_id) = home_of(&state.pool, card_id).await?;
    ensure_access(state.access.as_ref(), user_id, board_id).await?;

    let row = sqlx::query_as::<_, (i64, i64, String, String, i32)>(
        "UPDATE cards
         SET title = COALESCE($1, title), description = COALESCE($2, description)
         WHERE id = $3
         RETURNING id, list_id, title, description, position",
    )
    .bind(title)
    .bind(description)
    .bind(card_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(MutationError::NotFound { kind: "card", id: card_id })?;

    let (id, list_id, title, description, position) = row;
    Ok((board_id, CardRow { id, list_id, title, description, position }))
}

// =============================================================================
// MOVE
// =============================================================================

/// Move a card to `position` in `list_id` (same list or another one).
///
/// # Errors
///
/// `Position` when the target is outside `[0, sibling_count]`, `NotFound`
/// for a missing card or list, `Forbidden` for either board.
pub async fn move_card(
    state: &AppState,
    user_id: Uuid,
    card_id: i64,
    list_id: i64,
    position: i32,
) -> Result<CardMove, MutationError> {
    let moved = with_retry(state.retry, "move_card", || {
        move_card_once(state, user_id, card_id, list_id, position)
    })
    .await?;

    if moved.plan.is_noop() {
        return Ok(moved);
    }

    info!(
        card_id,
        cross_list = moved.plan.crosses_parents(),
        from_list = moved.plan.from.parent_id,
        to_list = moved.plan.to.parent_id,
        from_position = moved.plan.from.position,
        to_position = moved.plan.to.position,
        "card moved"
    );
    let event = moved_event(&moved);
    if moved.destination_board != moved.source_board {
        state.hub.publish(event.readdressed(moved.destination_board)).await;
    }
    state.hub.publish(event).await;
    Ok(moved)
}

async fn move_card_once(
    state: &AppState,
    user_id: Uuid,
    card_id: i64,
    list_id: i64,
    position: i32,
) -> Result<CardMove, MutationError> {
    let (source_list, source_board) = home_of(&state.pool, card_id).await?;
    let destination_board = list::board_of(&state.pool, list_id).await?;
    ensure_access(state.access.as_ref(), user_id, source_board).await?;
    if destination_board != source_board {
        ensure_access(state.access.as_ref(), user_id, destination_board).await?;
    }

    let mut tx = state.pool.begin().await?;
    position::lock_parents(&mut tx, ItemKind::Card, &[source_list, list_id]).await?;
    let from = position::locate(&mut tx, ItemKind::Card, card_id, source_list).await?;
    let plan = position::move_item(&mut tx, ItemKind::Card, card_id, from, Placement::new(list_id, position)).await?;
    tx.commit().await?;

    Ok(CardMove { card_id, source_board, destination_board, plan })
}

// =============================================================================
// DELETE
// =============================================================================

/// Delete a card and close the gap in its list.
///
/// # Errors
///
/// `NotFound` for a missing card, `Forbidden` when the caller may not edit
/// the board.
pub async fn delete_card(state: &AppState, user_id: Uuid, card_id: i64) -> Result<CardRemoval, MutationError> {
    let removal = with_retry(state.retry, "delete_card", || delete_card_once(state, user_id, card_id)).await?;

    info!(board_id = removal.board_id, card_id, list_id = removal.at.parent_id, "card deleted");
    state.hub.publish(deleted_event(&removal)).await;
    Ok(removal)
}

async fn delete_card_once(state: &AppState, user_id: Uuid, card_id: i64) -> Result<CardRemoval, MutationError> {
    let (list_id, board_id) = home_of(&state.pool, card_id).await?;
    ensure_access(state.access.as_ref(), user_id, board_id).await?;

    let mut tx = state.pool.begin().await?;
    position::lock_parents(&mut tx, ItemKind::Card, &[list_id]).await?;
    let at = position::locate(&mut tx, ItemKind::Card, card_id, list_id).await?;
    position::remove_item(&mut tx, ItemKind::Card, card_id, at).await?;
    tx.commit().await?;

    Ok(CardRemoval { card_id, board_id, at })
}

// =============================================================================
// EVENTS
// =============================================================================

pub(crate) fn created_event(board_id: i64, card: &CardRow) -> Event {
    Event::new(EventKind::Created, ItemKind::Card, board_id, Data::new())
        .with_data("id", card.id)
        .with_data("list_id", card.list_id)
        .with_data("title", card.title.clone())
        .with_data("description", card.description.clone())
        .with_data("position", card.position)
}

pub(crate) fn updated_event(board_id: i64, card: &CardRow) -> Event {
    Event::new(EventKind::Updated, ItemKind::Card, board_id, Data::new())
        .with_data("id", card.id)
        .with_data("list_id", card.list_id)
        .with_data("title", card.title.clone())
        .with_data("description", card.description.clone())
}

pub(crate) fn moved_event(moved: &CardMove) -> Event {
    let mut data = Data::new();
    data.insert("id".into(), json!(moved.card_id));
    data.insert("old_list_id".into(), json!(moved.plan.from.parent_id));
    data.insert("new_list_id".into(), json!(moved.plan.to.parent_id));
    data.insert("old_position".into(), json!(moved.plan.from.position));
    data.insert("new_position".into(), json!(moved.plan.to.position));
    Event::new(EventKind::Moved, ItemKind::Card, moved.source_board, data)
}

pub(crate) fn deleted_event(removal: &CardRemoval) -> Event {
    Event::new(EventKind::Deleted, ItemKind::Card, removal.board_id, Data::new())
        .with_data("id", removal.card_id)
        .with_data("list_id", removal.at.parent_id)
        .with_data("position", removal.at.position)
}

// =============================================================================
// HELPERS
// =============================================================================

/// List and board currently holding `card_id` (unlocked read).
async fn home_of(pool: &PgPool, card_id: i64) -> Result<(i64, i64), MutationError> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT c.list_id, l.board_id FROM cards c JOIN lists l ON l.id = c.list_id WHERE c.id = $1",
    )
    .bind(card_id)
    .fetch_optional(pool)
    .await?
    .ok_or(MutationError::NotFound { kind: "card", id: card_id })
}

/// Cards of one board, ordered by list then position.
///
/// # Errors
///
/// Propagates database errors.
pub async fn cards_for_board(pool: &PgPool, board_id: i64) -> Result<Vec<CardRow>, MutationError> {
    let rows = sqlx::query_as::<_, (i64, i64, String, String, i32)>(
        "SELECT c.id, c.list_id, c.title, c.description, c.position
         FROM cards c
         JOIN lists l ON l.id = c.list_id
         WHERE l.board_id = $1
         ORDER BY c.list_id ASC, c.position ASC",
    )
    .bind(board_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, list_id, title, description, position)| CardRow { id, list_id, title, description, position })
        .collect())
}

#[cfg(test)]
#[path = "card_test.rs"]
mod tests;
