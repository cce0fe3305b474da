//! Board service — creation, the caller's board list, and ordered snapshot.
//!
//! A snapshot is what a client loads before subscribing: lists in position
//! order, each with its cards in position order. Events received afterwards
//! patch this view.

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::services::card::{self, CardRow};
use crate::services::list::{self, ListRow};
use crate::services::mutation::{MutationError, ensure_access, require_title};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct BoardRow {
    pub id: i64,
    pub title: String,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListView {
    #[serde(flatten)]
    pub list: ListRow,
    pub cards: Vec<CardRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    #[serde(flatten)]
    pub board: BoardRow,
    pub lists: Vec<ListView>,
}

/// Create a board owned by `owner_id`, who also becomes its first member.
///
/// # Errors
///
/// `Validation` for a blank title, `Database` if the insert fails.
pub async fn create_board(pool: &PgPool, owner_id: Uuid, title: &str) -> Result<BoardRow, MutationError> {
    let title = require_title(title)?;

    let mut tx = pool.begin().await?;
    let id: i64 = sqlx::query_scalar("INSERT INTO boards (title, owner_id) VALUES ($1, $2) RETURNING id")
        .bind(title)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO board_members (board_id, user_id, role) VALUES ($1, $2, 'owner')")
        .bind(id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(board_id = id, %owner_id, "board created");
    Ok(BoardRow { id, title: title.to_owned(), owner_id })
}

/// Boards `user_id` owns or is an active member of, oldest first.
///
/// # Errors
///
/// Propagates database errors.
pub async fn boards_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<BoardRow>, MutationError> {
    let rows = sqlx::query_as::<_, (i64, String, Uuid)>(
        "SELECT b.id, b.title, b.owner_id
         FROM boards b
         WHERE b.owner_id = $1
            OR EXISTS (
                SELECT 1 FROM board_members m
                WHERE m.board_id = b.id AND m.user_id = $1 AND m.status = 'active'
            )
         ORDER BY b.id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id, title, owner_id)| BoardRow { id, title, owner_id }).collect())
}

/// Load a board with its lists and cards in position order.
///
/// # Errors
///
/// `Forbidden` when the caller may not view the board, `NotFound` when it
/// does not exist.
pub async fn snapshot(state: &AppState, user_id: Uuid, board_id: i64) -> Result<BoardSnapshot, MutationError> {
    ensure_access(state.access.as_ref(), user_id, board_id).await?;

    let (title, owner_id) = sqlx::query_as::<_, (String, Uuid)>("SELECT title, owner_id FROM boards WHERE id = $1")
        .bind(board_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(MutationError::NotFound { kind: "board", id: board_id })?;

    let lists = list::lists_for_board(&state.pool, board_id).await?;
    let cards = card::cards_for_board(&state.pool, board_id).await?;

    Ok(BoardSnapshot { board: BoardRow { id: board_id, title, owner_id }, lists: assemble(lists, cards) })
}

/// Group cards under their lists. Both inputs are already position-ordered.
fn assemble(lists: Vec<ListRow>, cards: Vec<CardRow>) -> Vec<ListView> {
    let mut views: Vec<ListView> = lists.into_iter().map(|list| ListView { list, cards: Vec::new() }).collect();
    for card in cards {
        if let Some(view) = views.iter_mut().find(|v| v.list.id == card.list_id) {
            view.cards.push(card);
        }
    }
    views
}
