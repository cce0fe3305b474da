//! Ordered siblings — dense zero-based positions under one parent.
//!
//! DESIGN
//! ======
//! Cards under a list and lists under a board share one algorithm. For a
//! fixed parent the positions are always exactly `{0, .., n-1}`. Every
//! operation is expressed as a small plan: at most two contiguous `Shift`
//! ranges plus the moved item's final `Placement`. Plans are pure; the
//! storage layer (`services::position`) executes them inside a single
//! transaction so a half-applied plan is never committed.
//!
//! Only the rows between the old and new slot are touched (plus the tails
//! of both parents on a cross-parent move). There is no global renumbering.
//!
//! BOUNDS
//! ======
//! Same-parent moves use an inclusive far bound (`old < p <= new` when
//! moving down) because the moved item still occupies its old slot. A
//! cross-parent move opens a slot with `p >= new` because the item is not
//! yet among the destination siblings. The valid target ranges differ for
//! the same reason; see `validate_target`.

/// Where an item sits: its parent and its rank among that parent's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent_id: i64,
    pub position: i32,
}

impl Placement {
    #[must_use]
    pub fn new(parent_id: i64, position: i32) -> Self {
        Self { parent_id, position }
    }
}

/// Add `delta` to every sibling under `parent_id` whose position lies in
/// `start..=end` (`end == None` means "through the last sibling").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub parent_id: i64,
    pub start: i32,
    pub end: Option<i32>,
    pub delta: i32,
}

/// Everything needed to move one item: sibling shifts, then the final slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub from: Placement,
    pub to: Placement,
    pub shifts: Vec<Shift>,
}

impl MovePlan {
    /// Moving onto the current slot changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    #[must_use]
    pub fn crosses_parents(&self) -> bool {
        self.from.parent_id != self.to.parent_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("position {position} out of range (expected 0..={max})")]
    OutOfRange { position: i32, max: i32 },
}

// =============================================================================
// APPEND / REMOVE
// =============================================================================

/// Position for a new last child, given the current maximum (if any).
#[must_use]
pub fn append_position(current_max: Option<i32>) -> i32 {
    current_max.map_or(0, |max| max + 1)
}

/// Close the gap left by removing the item at `at`.
#[must_use]
pub fn plan_remove(at: Placement) -> Shift {
    Shift { parent_id: at.parent_id, start: at.position + 1, end: None, delta: -1 }
}

// =============================================================================
// MOVE
// =============================================================================

/// Plan a move from `from` to `to`. The caller validates `to` first.
#[must_use]
pub fn plan_move(from: Placement, to: Placement) -> MovePlan {
    let mut shifts = Vec::with_capacity(2);

    if from.parent_id == to.parent_id {
        if to.position > from.position {
            // Moving down: the run between old and new slides up one slot.
            shifts.push(Shift {
                parent_id: from.parent_id,
                start: from.position + 1,
                end: Some(to.position),
                delta: -1,
            });
        } else if to.position < from.position {
            shifts.push(Shift {
                parent_id: from.parent_id,
                start: to.position,
                end: Some(from.position - 1),
                delta: 1,
            });
        }
    } else {
        shifts.push(plan_remove(from));
        shifts.push(Shift { parent_id: to.parent_id, start: to.position, end: None, delta: 1 });
    }

    MovePlan { from, to, shifts }
}

/// Largest legal target position given how many children the destination
/// parent currently has (counting the moved item if it already lives there).
#[must_use]
pub fn max_target(same_parent: bool, destination_count: i64) -> i32 {
    let count = i32::try_from(destination_count).unwrap_or(i32::MAX);
    if same_parent { (count - 1).max(0) } else { count }
}

/// Reject targets outside `[0, max_target]` before any row is touched.
///
/// # Errors
///
/// Returns `OutOfRange` for negative positions and positions past the end.
pub fn validate_target(from: Placement, to: Placement, destination_count: i64) -> Result<(), PositionError> {
    let max = max_target(from.parent_id == to.parent_id, destination_count);
    if to.position < 0 || to.position > max {
        return Err(PositionError::OutOfRange { position: to.position, max });
    }
    Ok(())
}

#[cfg(test)]
#[path = "ordering_test.rs"]
mod tests;
