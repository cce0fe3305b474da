//! Access control — who is calling, and may they act on this board.
//!
//! ARCHITECTURE
//! ============
//! Token issuance and role management live outside this service. The
//! real-time core only needs two answers, so they sit behind one trait:
//! resolve a bearer token to a principal, and decide whether that principal
//! may act on a board. Routes and the mutation service trust the answer and
//! perform no authorization of their own.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Resolve a session token. `None` for unknown or expired tokens.
    async fn authenticate(&self, token: &str) -> Result<Option<Principal>, sqlx::Error>;

    /// Whether `user_id` may view and edit `board_id`.
    async fn may_access_board(&self, user_id: Uuid, board_id: i64) -> Result<bool, sqlx::Error>;
}

/// Postgres-backed access control: `sessions` for tokens, board ownership
/// or active membership for board access.
pub struct PgAccessControl {
    pool: PgPool,
}

impl PgAccessControl {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessControl for PgAccessControl {
    async fn authenticate(&self, token: &str) -> Result<Option<Principal>, sqlx::Error> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT u.id, u.username
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, username)| Principal { user_id, username }))
    }

    async fn may_access_board(&self, user_id: Uuid, board_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM boards WHERE id = $1 AND owner_id = $2
                UNION ALL
                SELECT 1 FROM board_members
                WHERE board_id = $1 AND user_id = $2 AND status = 'active'
            )",
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }
}

/// Strip an optional `Bearer ` prefix from a raw token value.
#[must_use]
pub fn bare_token(raw: &str) -> &str {
    raw.trim().strip_prefix("Bearer ").unwrap_or(raw.trim()).trim()
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// In-memory access control: fixed tokens and an explicit grant set.
    #[derive(Default)]
    pub struct StaticAccess {
        pub tokens: HashMap<String, Principal>,
        pub grants: HashSet<(Uuid, i64)>,
    }

    impl StaticAccess {
        #[must_use]
        pub fn with_user(mut self, token: &str, user_id: Uuid, boards: &[i64]) -> Self {
            self.tokens
                .insert(token.to_owned(), Principal { user_id, username: format!("user-{token}") });
            for board_id in boards {
                self.grants.insert((user_id, *board_id));
            }
            self
        }
    }

    #[async_trait]
    impl AccessControl for StaticAccess {
        async fn authenticate(&self, token: &str) -> Result<Option<Principal>, sqlx::Error> {
            Ok(self.tokens.get(token).cloned())
        }

        async fn may_access_board(&self, user_id: Uuid, board_id: i64) -> Result<bool, sqlx::Error> {
            Ok(self.grants.contains(&(user_id, board_id)))
        }
    }
}
