//! List service — create, rename, reorder, delete with dense positions per board.
//!
//! Lists never leave their board, so a list move is always a same-parent
//! reorder. Deleting a list cascades to its cards; only the list event is
//! published and viewers drop the cards with it.

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::event::{Data, Event, EventKind, ItemKind};
use crate::ordering::{MovePlan, Placement};
use crate::services::mutation::{MutationError, ensure_access, require_title, with_retry};
use crate::services::position;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRow {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub position: i32,
}

// =============================================================================
// CREATE
// =============================================================================

/// Append a list to the end of `board_id`.
///
/// # Errors
///
/// `Validation` for a blank title, `Forbidden` when the caller may not edit
/// the board, `NotFound` if the board vanished.
pub async fn create_list(state: &AppState, user_id: Uuid, board_id: i64, title: &str) -> Result<ListRow, MutationError> {
    let title = require_title(title)?;
    let list = with_retry(state.retry, "create_list", || create_list_once(state, user_id, board_id, title)).await?;

    info!(%board_id, list_id = list.id, position = list.position, "list created");
    state.hub.publish(created_event(&list)).await;
    Ok(list)
}

async fn create_list_once(state: &AppState, user_id: Uuid, board_id: i64, title: &str) -> Result<ListRow, MutationError> {
    ensure_access(state.access.as_ref(), user_id, board_id).await?;

    let mut tx = state.pool.begin().await?;
    position::lock_parents(&mut tx, ItemKind::List, &[board_id]).await?;
    let position = position::append_position(&mut tx, ItemKind::List, board_id).await?;

    let id: i64 = sqlx::query_scalar("INSERT INTO lists (board_id, title, position) VALUES ($1, $2, $3) RETURNING id")
        .bind(board_id)
        .bind(title)
        .bind(position)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(ListRow { id, board_id, title: title.to_owned(), position })
}

// =============================================================================
// UPDATE
// =============================================================================

/// Rename a list. Its position is untouched.
///
/// # Errors
///
/// `Validation` for a blank title, `NotFound` for a missing list,
/// `Forbidden` when the caller may not edit the board.
pub async fn update_list(state: &AppState, user_id: Uuid, list_id: i64, title: &str) -> Result<ListRow, MutationError> {
    let title = require_title(title)?;
    let list = with_retry(state.retry, "update_list", || update_list_once(state, user_id, list_id, title)).await?;

    info!(board_id = list.board_id, list_id, "list renamed");
    state.hub.publish(updated_event(&list)).await;
    Ok(list)
}

async fn update_list_once(state: &AppState, user_id: Uuid, list_id: i64, title: &str) -> Result<ListRow, MutationError> {
    let board_id = board_of(&state.pool, list_id).await?;
    ensure_access(state.access.as_ref(), user_id, board_id).await?;

    let position: i32 = sqlx::query_scalar("UPDATE lists SET title = $1 WHERE id = $2 RETURNING position")
        .bind(title)
        .bind(list_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(MutationError::NotFound { kind: "list", id: list_id })?;

    Ok(ListRow { id: list_id, board_id, title: title.to_owned(), position })
}

// =============================================================================
// MOVE
// =============================================================================

/// Reorder a list within its board.
///
/// # Errors
///
/// `Position` when the target is outside `[0, list_count - 1]`.
pub async fn move_list(state: &AppState, user_id: Uuid, list_id: i64, position: i32) -> Result<MovePlan, MutationError> {
    let plan = with_retry(state.retry, "move_list", || move_list_once(state, user_id, list_id, position)).await?;

    if !plan.is_noop() {
        info!(
            board_id = plan.from.parent_id,
            list_id,
            from_position = plan.from.position,
            to_position = plan.to.position,
            "list moved"
        );
        state.hub.publish(moved_event(list_id, &plan)).await;
    }
    Ok(plan)
}

async fn move_list_once(state: &AppState, user_id: Uuid, list_id: i64, position: i32) -> Result<MovePlan, MutationError> {
    let board_id = board_of(&state.pool, list_id).await?;
    ensure_access(state.access.as_ref(), user_id, board_id).await?;

    let mut tx = state.pool.begin().await?;
    position::lock_parents(&mut tx, ItemKind::List, &[board_id]).await?;
    let from = position::locate(&mut tx, ItemKind::List, list_id, board_id).await?;
    let plan = position::move_item(&mut tx, ItemKind::List, list_id, from, Placement::new(board_id, position)).await?;
    tx.commit().await?;

    Ok(plan)
}

// =============================================================================
// DELETE
// =============================================================================

/// Delete a list (and its cards) and close the gap on the board.
///
/// # Errors
///
/// `NotFound` for a missing list, `Forbidden` when the caller may not edit
/// the board.
pub async fn delete_list(state: &AppState, user_id: Uuid, list_id: i64) -> Result<Placement, MutationError> {
    let at = with_retry(state.retry, "delete_list", || delete_list_once(state, user_id, list_id)).await?;

    info!(board_id = at.parent_id, list_id, "list deleted");
    state.hub.publish(deleted_event(list_id, at)).await;
    Ok(at)
}

async fn delete_list_once(state: &AppState, user_id: Uuid, list_id: i64) -> Result<Placement, MutationError> {
    let board_id = board_of(&state.pool, list_id).await?;
    ensure_access(state.access.as_ref(), user_id, board_id).await?;

    let mut tx = state.pool.begin().await?;
    position::lock_parents(&mut tx, ItemKind::List, &[board_id]).await?;
    let at = position::locate(&mut tx, ItemKind::List, list_id, board_id).await?;
    position::remove_item(&mut tx, ItemKind::List, list_id, at).await?;
    tx.commit().await?;

    Ok(at)
}

// =============================================================================
// EVENTS
// =============================================================================

pub(crate) fn created_event(list: &ListRow) -> Event {
    Event::new(EventKind::Created, ItemKind::List, list.board_id, Data::new())
        .with_data("id", list.id)
        .with_data("board_id", list.board_id)
        .with_data("title", list.title.clone())
        .with_data("position", list.position)
}

pub(crate) fn updated_event(list: &ListRow) -> Event {
    Event::new(EventKind::Updated, ItemKind::List, list.board_id, Data::new())
        .with_data("id", list.id)
        .with_data("board_id", list.board_id)
        .with_data("title", list.title.clone())
}

pub(crate) fn moved_event(list_id: i64, plan: &MovePlan) -> Event {
    Event::new(EventKind::Moved, ItemKind::List, plan.to.parent_id, Data::new())
        .with_data("id", list_id)
        .with_data("board_id", plan.to.parent_id)
        .with_data("old_position", plan.from.position)
        .with_data("new_position", plan.to.position)
}

pub(crate) fn deleted_event(list_id: i64, at: Placement) -> Event {
    Event::new(EventKind::Deleted, ItemKind::List, at.parent_id, Data::new())
        .with_data("id", list_id)
        .with_data("board_id", at.parent_id)
        .with_data("position", at.position)
}

// =============================================================================
// QUERIES
// =============================================================================

/// Board owning `list_id`.
///
/// # Errors
///
/// `NotFound` for a missing list.
pub async fn board_of(pool: &PgPool, list_id: i64) -> Result<i64, MutationError> {
    sqlx::query_scalar::<_, i64>("SELECT board_id FROM lists WHERE id = $1")
        .bind(list_id)
        .fetch_optional(pool)
        .await?
        .ok_or(MutationError::NotFound { kind: "list", id: list_id })
}

/// Lists of one board in position order.
///
/// # Errors
///
/// Propagates database errors.
pub async fn lists_for_board(pool: &PgPool, board_id: i64) -> Result<Vec<ListRow>, MutationError> {
    let rows = sqlx::query_as::<_, (i64, String, i32)>(
        "SELECT id, title, position FROM lists WHERE board_id = $1 ORDER BY position ASC",
    )
    .bind(board_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, title, position)| ListRow { id, board_id, title, position })
        .collect())
}
