//! Commands understood by the overlay controller.
//!
//! Every input reaches the [`GridOverlayController`](crate::controller::GridOverlayController)
//! as a [`Command`]: the hotkey trigger (over the Unix socket) sends
//! [`Command::Toggle`], and the overlay widget turns pointer activity into
//! the `Pointer*` variants.
//!
//! Cells may be written either as `{"row": 1, "col": 2}` or as the compact
//! string `"1 2"` (row first).

use crate::geometry::Cell;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};

/// An action for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Show the overlay, or hide it if it is already visible.
    Toggle,
    /// Pointer pressed over `cell`; starts a selection.
    PointerDown(#[serde(deserialize_with = "deserialize_cell")] Cell),
    /// Pointer dragged over `cell`.
    PointerMove(#[serde(deserialize_with = "deserialize_cell")] Cell),
    /// Pointer released; resizes the captured window to the selection.
    PointerUp,
}

/// Wire form of a cell: object or `"row col"` string.
#[derive(Deserialize)]
#[serde(untagged)]
enum CellRepr {
    Object { row: u32, col: u32 },
    Compact(String),
}

fn parse_compact_cell(s: &str) -> Option<Cell> {
    let mut parts = s.split_whitespace();
    let row = parts.next()?.parse().ok()?;
    let col = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Cell::new(row, col))
}

fn deserialize_cell<'de, D>(deserializer: D) -> Result<Cell, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = match CellRepr::deserialize(deserializer)? {
        CellRepr::Object { row, col } => Cell::new(row, col),
        CellRepr::Compact(s) => parse_compact_cell(&s)
            .ok_or_else(|| DeError::custom(format!("expected \"row col\", got {:?}", s)))?,
    };
    if cell.row == 0 || cell.col == 0 {
        return Err(DeError::custom(format!("cells are 1-indexed, got {}", cell)));
    }
    Ok(cell)
}
