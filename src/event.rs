//! Event — the message fanned out to every viewer of a board.
//!
//! ARCHITECTURE
//! ============
//! Mutations produce exactly one `Event` after their transaction commits.
//! The hub serializes it once and pushes the same bytes to every connection
//! subscribed to `board_id`.
//!
//! WIRE CONTRACT
//! =============
//! `{"type": "<created|updated|moved|deleted>_<card|list>", "board_id": <int>, "data": {...}}`
//!
//! `type` is kept as a plain string so consumers (and our own tests) can
//! decode events whose type they don't know yet and simply ignore them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// Entity that participates in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Ordered among the cards of one list.
    Card,
    /// Ordered among the lists of one board.
    List,
}

impl ItemKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::List => "list",
        }
    }

    /// Table holding rows of this kind.
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            Self::Card => "cards",
            Self::List => "lists",
        }
    }

    /// Table holding the parents of this kind.
    #[must_use]
    pub fn parent_table(self) -> &'static str {
        match self {
            Self::Card => "lists",
            Self::List => "boards",
        }
    }

    /// Column on `table()` referencing the parent row.
    #[must_use]
    pub fn parent_column(self) -> &'static str {
        match self {
            Self::Card => "list_id",
            Self::List => "board_id",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Updated,
    Moved,
    Deleted,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Moved => "moved",
            Self::Deleted => "deleted",
        }
    }

    /// Wire `type` for this event applied to `item`, e.g. `moved_card`.
    #[must_use]
    pub fn type_name(self, item: ItemKind) -> String {
        format!("{}_{}", self.as_str(), item.as_str())
    }
}

/// A board change notification. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: String,
    board_id: i64,
    data: Data,
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error responses.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, item: ItemKind, board_id: i64, data: Data) -> Self {
        Self { kind: kind.type_name(item), board_id, data }
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Same event addressed to another board. Used when a card crosses boards.
    #[must_use]
    pub fn readdressed(&self, board_id: i64) -> Self {
        Self { kind: self.kind.clone(), board_id, data: self.data.clone() }
    }
}

// =============================================================================
// ACCESSORS
// =============================================================================

impl Event {
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn board_id(&self) -> i64 {
        self.board_id
    }

    #[must_use]
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Serialize to the wire text handed to every subscriber.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the payload cannot be encoded.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
