//! Shared mutation plumbing — error type, retry loop, access gate.
//!
//! ERROR HANDLING
//! ==============
//! Storage errors are classified once, here:
//! - deadlock (`40P01`) and serialization failure (`40001`) are retryable;
//! - integrity violations (`23xxx`) are fatal `Conflict`s;
//! - everything else is an opaque `Database` error.
//!
//! `Contention` covers the case where an item changed parent between the
//! unlocked lookup and the locked re-read; rerunning the whole mutation is
//! always safe because nothing was committed.

use std::future::Future;

use tracing::warn;
use uuid::Uuid;

use crate::config::RetryPolicy;
use crate::event::ErrorCode;
use crate::ordering::PositionError;
use crate::services::access::AccessControl;

const SQLSTATE_DEADLOCK: &str = "40P01";
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
const SQLSTATE_INTEGRITY_CLASS: &str = "23";

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },
    #[error("access denied to board {0}")]
    Forbidden(i64),
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} changed concurrently")]
    Contention(&'static str),
    #[error("constraint violation: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for MutationError {
    fn from(err: sqlx::Error) -> Self {
        let integrity = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code.starts_with(SQLSTATE_INTEGRITY_CLASS));
        if integrity {
            return Self::Conflict(err.to_string());
        }
        Self::Database(err)
    }
}

impl ErrorCode for MutationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "E_NOT_FOUND",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Position(_) => "E_INVALID_POSITION",
            Self::Validation(_) => "E_VALIDATION",
            Self::Contention(_) => "E_CONTENTION",
            Self::Conflict(_) => "E_CONFLICT",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Contention(_) => true,
            Self::Database(err) => err
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == SQLSTATE_DEADLOCK || code == SQLSTATE_SERIALIZATION_FAILURE),
            _ => false,
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
///
/// # Errors
///
/// Returns the last error from `op`.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, op_name: &'static str, mut op: F) -> Result<T, MutationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MutationError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.retryable() && attempt < policy.attempts => {
                warn!(op = op_name, attempt, total = policy.attempts, error = %e, "mutation failed; retrying");
                tokio::time::sleep(policy.backoff(attempt)).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Ask the access collaborator whether `user_id` may touch `board_id`.
///
/// # Errors
///
/// `Forbidden` on a negative answer, `Database` if the check itself failed.
pub async fn ensure_access(access: &dyn AccessControl, user_id: Uuid, board_id: i64) -> Result<(), MutationError> {
    if access.may_access_board(user_id, board_id).await? {
        Ok(())
    } else {
        Err(MutationError::Forbidden(board_id))
    }
}

/// Reject blank titles before any transaction starts.
///
/// # Errors
///
/// `Validation` when the trimmed title is empty.
pub fn require_title(title: &str) -> Result<&str, MutationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(MutationError::Validation("title required".into()));
    }
    Ok(title)
}
