//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! passed by reference into services. It holds the database pool, the hub
//! handle, and the access-control collaborator. Board membership itself is
//! not here: the hub task owns it exclusively.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::RetryPolicy;
use crate::hub::Hub;
use crate::services::access::AccessControl;

/// Clone is required by Axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub hub: Hub,
    pub access: Arc<dyn AccessControl>,
    pub retry: RetryPolicy,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, hub: Hub, access: Arc<dyn AccessControl>, retry: RetryPolicy) -> Self {
        Self { pool, hub, access, retry }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
