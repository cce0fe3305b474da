//! Position storage — executes ordering plans inside a transaction.
//!
//! DESIGN
//! ======
//! One code path serves cards (parent: list) and lists (parent: board);
//! `ItemKind` supplies the table and parent column. Every function takes
//! the open transaction's connection, so the caller decides where the
//! transaction begins and commits.
//!
//! CONCURRENCY
//! ===========
//! Callers lock the affected parent rows (`lock_parents`) before reading
//! counts or positions. Two parents are locked in ascending id order so
//! concurrent cross-parent moves cannot deadlock on each other. With the
//! parent locked, the sibling range read here cannot go stale before the
//! shifts are written.

use sqlx::PgConnection;

use crate::event::ItemKind;
use crate::ordering::{self, MovePlan, Placement, Shift};
use crate::services::mutation::MutationError;

fn parent_kind(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Card => "list",
        ItemKind::List => "board",
    }
}

/// Lock parent rows of `kind` items, ascending by id.
///
/// # Errors
///
/// `NotFound` naming the first missing parent.
pub async fn lock_parents(conn: &mut PgConnection, kind: ItemKind, parent_ids: &[i64]) -> Result<(), MutationError> {
    let mut ids = parent_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let sql = format!("SELECT id FROM {} WHERE id = ANY($1) ORDER BY id FOR UPDATE", kind.parent_table());
    let locked: Vec<i64> = sqlx::query_scalar(&sql).bind(ids.as_slice()).fetch_all(&mut *conn).await?;

    if let Some(missing) = ids.iter().find(|id| !locked.contains(*id)) {
        return Err(MutationError::NotFound { kind: parent_kind(kind), id: *missing });
    }
    Ok(())
}

/// Number of children currently under `parent_id`.
///
/// # Errors
///
/// Propagates database errors.
pub async fn sibling_count(conn: &mut PgConnection, kind: ItemKind, parent_id: i64) -> Result<i64, MutationError> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = $1", kind.table(), kind.parent_column());
    let count: i64 = sqlx::query_scalar(&sql).bind(parent_id).fetch_one(&mut *conn).await?;
    Ok(count)
}

/// Position a new last child of `parent_id` would take.
///
/// # Errors
///
/// Propagates database errors.
pub async fn append_position(conn: &mut PgConnection, kind: ItemKind, parent_id: i64) -> Result<i32, MutationError> {
    let sql = format!("SELECT MAX(position) FROM {} WHERE {} = $1", kind.table(), kind.parent_column());
    let max: Option<i32> = sqlx::query_scalar(&sql).bind(parent_id).fetch_one(&mut *conn).await?;
    Ok(ordering::append_position(max))
}

/// Lock an item row and return where it sits, verifying it is still under
/// `expected_parent` (the parent the caller locked).
///
/// # Errors
///
/// `NotFound` if the item is gone, `Contention` if it changed parent.
pub async fn locate(
    conn: &mut PgConnection,
    kind: ItemKind,
    id: i64,
    expected_parent: i64,
) -> Result<Placement, MutationError> {
    let sql = format!("SELECT {}, position FROM {} WHERE id = $1 FOR UPDATE", kind.parent_column(), kind.table());
    let row: Option<(i64, i32)> = sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await?;

    let Some((parent_id, position)) = row else {
        return Err(MutationError::NotFound { kind: kind.as_str(), id });
    };
    if parent_id != expected_parent {
        return Err(MutationError::Contention(kind.as_str()));
    }
    Ok(Placement::new(parent_id, position))
}

/// Apply one shift, skipping the item being moved.
///
/// # Errors
///
/// Propagates database errors.
pub async fn apply_shift(
    conn: &mut PgConnection,
    kind: ItemKind,
    shift: Shift,
    skip_id: Option<i64>,
) -> Result<u64, MutationError> {
    let sql = format!(
        "UPDATE {table} SET position = position + $1
         WHERE {parent} = $2
           AND position >= $3
           AND ($4::INTEGER IS NULL OR position <= $4)
           AND ($5::BIGINT IS NULL OR id <> $5)",
        table = kind.table(),
        parent = kind.parent_column(),
    );
    let result = sqlx::query(&sql)
        .bind(shift.delta)
        .bind(shift.parent_id)
        .bind(shift.start)
        .bind(shift.end)
        .bind(skip_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Validate and apply a move of item `id` from `from` to `to`. Parents must
/// already be locked and `from` obtained through `locate`.
///
/// # Errors
///
/// `Position` when `to` is out of range; nothing is written in that case.
pub async fn move_item(
    conn: &mut PgConnection,
    kind: ItemKind,
    id: i64,
    from: Placement,
    to: Placement,
) -> Result<MovePlan, MutationError> {
    let destination_count = sibling_count(conn, kind, to.parent_id).await?;
    ordering::validate_target(from, to, destination_count)?;

    let plan = ordering::plan_move(from, to);
    if plan.is_noop() {
        return Ok(plan);
    }

    for shift in &plan.shifts {
        apply_shift(conn, kind, *shift, Some(id)).await?;
    }

    let sql = format!("UPDATE {} SET {} = $1, position = $2 WHERE id = $3", kind.table(), kind.parent_column());
    sqlx::query(&sql)
        .bind(plan.to.parent_id)
        .bind(plan.to.position)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(plan)
}

/// Delete item `id` at `at` and close the gap it leaves.
///
/// # Errors
///
/// Propagates database errors.
pub async fn remove_item(conn: &mut PgConnection, kind: ItemKind, id: i64, at: Placement) -> Result<(), MutationError> {
    let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
    sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
    apply_shift(conn, kind, ordering::plan_remove(at), None).await?;
    Ok(())
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "position_test.rs"]
mod tests;
