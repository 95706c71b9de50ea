//! Seams between the overlay logic and the outside world.
//!
//! * [`WindowHelper`] — query the focused window and move/resize it, so the
//!   controller is not tied to X11 or to any particular tool.
//! * [`CommandSource`] — deliver user intent (the hotkey trigger) over some
//!   transport.
//! * [`OverlayEvent`] — what the controller broadcasts to whatever renders
//!   the overlay.

use crate::command::Command;
use crate::geometry::{GridDimensions, PixelRect};
use crate::selection::SelectionState;
use std::fmt;
use std::sync::mpsc;

/// Opaque handle of a top-level window, as the window system names it
/// (for X11, a hex id such as `0x3a00007`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abstraction over the window system primitives the overlay needs.
///
/// An implementation might shell out to `xprop`/`wmctrl`, or it might be a
/// recording stub used in tests.
pub trait WindowHelper {
    /// The error type produced by this helper.
    type Error: std::error::Error + Send + 'static;

    /// Return the currently focused window.
    ///
    /// Fails if no window is focused.
    fn active_window(&self) -> Result<WindowId, Self::Error>;

    /// Un-maximize `id` if needed, then move and resize it to `rect`.
    fn resize_window(&self, id: &WindowId, rect: PixelRect) -> Result<(), Self::Error>;
}

//  Overlay

/// Selected/unselected flag for every cell of a grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellMask {
    selected: Vec<bool>,
}

impl CellMask {
    /// Ask `selection` about every cell of `dimensions`.
    pub fn from_selection(dimensions: GridDimensions, selection: &SelectionState) -> Self {
        Self {
            selected: dimensions
                .cells()
                .map(|cell| selection.is_cell_selected(cell))
                .collect(),
        }
    }

    /// Flags in row-major order, one per cell.
    pub fn flags(&self) -> &[bool] {
        &self.selected
    }

    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }
}

/// Events sent from the [`GridOverlayController`](crate::controller::GridOverlayController)
/// to the overlay renderer over an [`mpsc`](std::sync::mpsc) channel.
///
/// The controller is the only writer of selection state; the renderer's
/// cells only react to these events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    /// Show the overlay frame at `frame` (screen pixels).
    Show { frame: PixelRect },
    /// Hide the overlay.
    Hide,
    /// Repaint each cell as selected or not.
    Highlight(CellMask),
    /// Return every cell to its unselected appearance.
    Reset,
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport and forward parsed commands
/// into the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}
