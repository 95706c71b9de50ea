//! Drag selection state machine.
//!
//! A selection is anchored at the cell where the pointer went down and
//! follows the pointer until release:
//!
//! ```text
//! Idle ──begin──▶ Dragging ──update──▶ Dragging ──end──▶ Idle
//! ```
//!
//! [`SelectionState::end`] hands back the final [`NormalizedRegion`] and
//! returns to `Idle` in the same step, so a completed selection can only be
//! read once.  Cells passed in are assumed to be inside the grid already;
//! they come from [`cell_at`](crate::geometry::cell_at), which clamps.

use crate::geometry::{Cell, NormalizedRegion};

/// Errors from calling the state machine out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// `end` was called with no drag in progress.
    #[error("no selection in progress")]
    InvalidState,
    /// `begin` was called while a drag was already in progress.
    #[error("a selection is already in progress")]
    AlreadyDragging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Dragging { start: Cell, current: Cell },
}

/// Tracks the anchor and live end of one drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    phase: Phase,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }

    /// Anchor of the current drag, if any.
    pub fn anchor(&self) -> Option<Cell> {
        match self.phase {
            Phase::Dragging { start, .. } => Some(start),
            Phase::Idle => None,
        }
    }

    /// Start a drag at `cell`.
    pub fn begin(&mut self, cell: Cell) -> Result<(), SelectionError> {
        if self.is_dragging() {
            return Err(SelectionError::AlreadyDragging);
        }
        self.phase = Phase::Dragging {
            start: cell,
            current: cell,
        };
        Ok(())
    }

    /// Move the live end of the drag to `cell`.
    ///
    /// Returns `true` if the extent changed.  Ignored while idle: the UI
    /// layer delivers motion events with no button held.
    pub fn update(&mut self, cell: Cell) -> bool {
        match &mut self.phase {
            Phase::Dragging { current, .. } if *current != cell => {
                *current = cell;
                true
            }
            _ => false,
        }
    }

    /// Finish the drag and return its region.
    pub fn end(&mut self) -> Result<NormalizedRegion, SelectionError> {
        let region = self.region().ok_or(SelectionError::InvalidState)?;
        self.phase = Phase::Idle;
        Ok(region)
    }

    /// Drop any drag in progress without producing a region.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
    }

    /// The live region of the drag in progress.
    pub fn region(&self) -> Option<NormalizedRegion> {
        match self.phase {
            Phase::Dragging { start, current } => Some(NormalizedRegion::spanning(start, current)),
            Phase::Idle => None,
        }
    }

    /// Whether `cell` is inside the live region.  Always `false` while idle.
    pub fn is_cell_selected(&self, cell: Cell) -> bool {
        self.region().is_some_and(|r| r.contains(cell))
    }
}
