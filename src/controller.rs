//! The orchestrator that ties the selection grid, the window helper, and
//! the overlay together.
//!
//! [`GridOverlayController`] owns the [`SelectionState`] and reacts to
//! [`Command`]s by updating it, broadcasting [`OverlayEvent`]s to the
//! renderer, and finally resizing the captured window through the
//! [`WindowHelper`] trait.
//!
//! ```text
//! Hidden ──toggle──▶ Shown ──PointerDown──▶ Shown+Dragging
//!   ▲                  │                          │
//!   └─────toggle───────┘◀────────toggle───────────┤
//!   └───────────────────────PointerUp─────────────┘  (resize, then hide)
//! ```

use crate::command::Command;
use crate::config::Settings;
use crate::geometry::{region_to_pixel_rect, Cell, GridDimensions, PixelRect, ScreenBounds};
use crate::selection::{SelectionError, SelectionState};
use crate::traits::{CellMask, OverlayEvent, WindowHelper, WindowId};
use log::{debug, info, warn};
use std::sync::mpsc;

/// Possible errors from the controller.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The focused window could not be determined; the overlay stays hidden.
    #[error("no active window: {0}")]
    NoActiveWindow(String),
    /// The window helper rejected the resize.  The overlay has still been
    /// hidden and the selection reset.
    #[error("resize failed: {0}")]
    Resize(String),
    /// A pointer event arrived out of order.
    #[error("invalid selection state: {0}")]
    Selection(#[from] SelectionError),
}

/// Overlay visibility.  The window is captured when the overlay is shown
/// and dropped when it is hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Visibility {
    Hidden,
    Shown { window: WindowId },
}

/// Bridges pointer and toggle events to the selection state, the overlay
/// and the window helper.
///
/// Generic over any [`WindowHelper`], so it does not know about X11.
///
/// # Typical usage
///
/// ```ignore
/// let mut controller = GridOverlayController::new(XorgWindowHelper::new(), &settings);
/// controller.handle(Command::Toggle)?;
/// controller.handle(Command::PointerDown(Cell::new(1, 1)))?;
/// controller.handle(Command::PointerMove(Cell::new(2, 3)))?;
/// controller.handle(Command::PointerUp)?;
/// ```
pub struct GridOverlayController<W: WindowHelper> {
    windows: W,
    dimensions: GridDimensions,
    bounds: ScreenBounds,
    frame: PixelRect,
    visibility: Visibility,
    selection: SelectionState,
    overlay_tx: Option<mpsc::Sender<OverlayEvent>>,
}

impl<W: WindowHelper> GridOverlayController<W> {
    /// Create a hidden controller for the grid and screen in `settings`.
    pub fn new(windows: W, settings: &Settings) -> Self {
        Self {
            windows,
            dimensions: settings.dimensions,
            bounds: settings.bounds,
            frame: settings.frame(),
            visibility: Visibility::Hidden,
            selection: SelectionState::new(),
            overlay_tx: None,
        }
    }

    /// Attach an overlay event channel.
    ///
    /// The controller will send [`OverlayEvent::Show`] / [`OverlayEvent::Hide`]
    /// on visibility changes, [`OverlayEvent::Highlight`] whenever the set of
    /// selected cells changes, and [`OverlayEvent::Reset`] whenever the
    /// selection is dropped.
    pub fn set_overlay(&mut self, tx: mpsc::Sender<OverlayEvent>) {
        self.overlay_tx = Some(tx);
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.visibility, Visibility::Shown { .. })
    }

    pub fn is_dragging(&self) -> bool {
        self.selection.is_dragging()
    }

    /// The window captured when the overlay was shown.
    pub fn active_window(&self) -> Option<&WindowId> {
        match &self.visibility {
            Visibility::Shown { window } => Some(window),
            Visibility::Hidden => None,
        }
    }

    /// Process a single [`Command`].
    pub fn handle(&mut self, cmd: Command) -> Result<(), ControllerError> {
        debug!("command: {:?}", cmd);
        match cmd {
            Command::Toggle => self.toggle(),
            Command::PointerDown(cell) => self.on_pointer_down(cell),
            Command::PointerMove(cell) => {
                self.on_pointer_move(cell);
                Ok(())
            }
            Command::PointerUp => self.on_pointer_up(),
        }
    }

    /// Show the overlay if it is hidden, hide it otherwise.
    ///
    /// Showing captures the focused window first; if that fails, the
    /// overlay stays hidden and nothing is broadcast.  Hiding discards any
    /// drag in progress.
    pub fn toggle(&mut self) -> Result<(), ControllerError> {
        if self.is_visible() {
            info!("hide overlay");
            self.hide();
            return Ok(());
        }

        let window = self
            .windows
            .active_window()
            .map_err(|e| ControllerError::NoActiveWindow(e.to_string()))?;
        info!("show overlay at {} for window {}", self.frame, window);
        self.visibility = Visibility::Shown { window };
        self.send(OverlayEvent::Show { frame: self.frame });
        Ok(())
    }

    /// Start a selection at `cell`.
    ///
    /// Ignored while the overlay is hidden (a press can race with a hide)
    /// and for cells outside the grid, which only a socket client can send.
    pub fn on_pointer_down(&mut self, cell: Cell) -> Result<(), ControllerError> {
        if !self.is_visible() {
            warn!("pointer down at {} while hidden, ignoring", cell);
            return Ok(());
        }
        if !self.in_grid(cell) {
            return Ok(());
        }
        self.selection.begin(cell)?;
        debug!("selection anchored at {}", cell);
        self.broadcast_highlight();
        Ok(())
    }

    /// Extend the selection to `cell`.
    ///
    /// Motion without a drag in progress is expected from the UI and is
    /// ignored.  Nothing is broadcast if the extent did not change.
    pub fn on_pointer_move(&mut self, cell: Cell) {
        if !self.selection.is_dragging() || !self.in_grid(cell) {
            return;
        }
        if self.selection.update(cell) {
            self.broadcast_highlight();
        }
    }

    /// Finish the selection and resize the captured window to it.
    ///
    /// The overlay is hidden and the selection reset whether or not the
    /// resize succeeds; a resize failure is still returned.  A release
    /// after the overlay was hidden mid-drag (Escape, hotkey) is ignored.
    pub fn on_pointer_up(&mut self) -> Result<(), ControllerError> {
        let Visibility::Shown { window } = &self.visibility else {
            debug!("pointer up while hidden, ignoring");
            return Ok(());
        };
        let region = self.selection.end()?;
        let rect = region_to_pixel_rect(region, self.dimensions, self.bounds);

        info!("resize window {} to {} ({})", window, rect, region);
        let result = self
            .windows
            .resize_window(window, rect)
            .map_err(|e| ControllerError::Resize(e.to_string()));

        self.hide();
        result
    }

    //  internals

    fn hide(&mut self) {
        self.selection.reset();
        self.visibility = Visibility::Hidden;
        self.send(OverlayEvent::Hide);
        self.send(OverlayEvent::Reset);
    }

    fn in_grid(&self, cell: Cell) -> bool {
        let inside = self.dimensions.contains(cell);
        if !inside {
            warn!(
                "cell {} is outside the {}x{} grid, ignoring",
                cell,
                self.dimensions.columns(),
                self.dimensions.rows()
            );
        }
        inside
    }

    fn broadcast_highlight(&self) {
        if self.overlay_tx.is_some() {
            let mask = CellMask::from_selection(self.dimensions, &self.selection);
            debug!("highlight {} cell(s)", mask.selected_count());
            self.send(OverlayEvent::Highlight(mask));
        }
    }

    fn send(&self, event: OverlayEvent) {
        if let Some(tx) = &self.overlay_tx {
            let _ = tx.send(event);
        }
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GridConfig, Settings};
    use std::cell::{Cell as StdCell, RefCell};

    /// Record-keeping mock window helper.
    #[derive(Debug, Default)]
    struct RecorderWindows {
        resizes: RefCell<Vec<(WindowId, PixelRect)>>,
        queries: StdCell<usize>,
        no_active_window: StdCell<bool>,
        fail_resize: StdCell<bool>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recorder error")]
    struct RecorderErr;

    impl WindowHelper for RecorderWindows {
        type Error = RecorderErr;

        fn active_window(&self) -> Result<WindowId, RecorderErr> {
            self.queries.set(self.queries.get() + 1);
            if self.no_active_window.get() {
                return Err(RecorderErr);
            }
            Ok(WindowId::new(format!("0x{:x}", 0xbeef + self.queries.get())))
        }

        fn resize_window(&self, id: &WindowId, rect: PixelRect) -> Result<(), RecorderErr> {
            self.resizes.borrow_mut().push((id.clone(), rect));
            if self.fail_resize.get() {
                return Err(RecorderErr);
            }
            Ok(())
        }
    }

    /// 8×4 grid on a 1600×800 screen: 200×200 pixel cells.
    fn make_controller() -> GridOverlayController<RecorderWindows> {
        let settings = Settings::resolve(&GridConfig::default(), ScreenBounds::new(1600, 800));
        GridOverlayController::new(RecorderWindows::default(), &settings)
    }

    fn with_overlay() -> (GridOverlayController<RecorderWindows>, mpsc::Receiver<OverlayEvent>) {
        let mut c = make_controller();
        let (tx, rx) = mpsc::channel();
        c.set_overlay(tx);
        (c, rx)
    }

    fn drag(c: &mut GridOverlayController<RecorderWindows>, from: Cell, to: Cell) {
        c.handle(Command::PointerDown(from)).unwrap();
        c.handle(Command::PointerMove(to)).unwrap();
    }

    #[test]
    fn starts_hidden() {
        let c = make_controller();
        assert!(!c.is_visible());
        assert!(!c.is_dragging());
        assert!(c.active_window().is_none());
        assert_eq!(c.dimensions(), GridDimensions::default());
    }

    #[test]
    fn toggle_shows_centered_frame_and_captures_window() {
        let (mut c, rx) = with_overlay();
        c.handle(Command::Toggle).unwrap();
        assert!(c.is_visible());
        assert!(c.active_window().is_some());
        let events: Vec<OverlayEvent> = rx.try_iter().collect();
        // 1600/3.5 = 457, 800/3.5 = 228
        assert_eq!(
            events,
            vec![OverlayEvent::Show {
                frame: PixelRect::new(571, 286, 457, 228)
            }]
        );
    }

    #[test]
    fn toggle_twice_hides_and_resets() {
        let (mut c, rx) = with_overlay();
        c.toggle().unwrap();
        c.toggle().unwrap();
        assert!(!c.is_visible());
        assert!(c.active_window().is_none());
        let events: Vec<OverlayEvent> = rx.try_iter().collect();
        assert!(
            matches!(
                events.as_slice(),
                [OverlayEvent::Show { .. }, OverlayEvent::Hide, OverlayEvent::Reset]
            ),
            "got: {events:#?}"
        );
    }

    #[test]
    fn window_is_recaptured_on_every_show() {
        let mut c = make_controller();
        c.toggle().unwrap();
        let first = c.active_window().cloned();
        c.toggle().unwrap();
        c.toggle().unwrap();
        let second = c.active_window().cloned();
        assert_eq!(c.windows.queries.get(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn drag_down_right_resizes_window() {
        let mut c = make_controller();
        c.toggle().unwrap();
        let window = c.active_window().cloned().unwrap();
        drag(&mut c, Cell::new(1, 1), Cell::new(2, 3));
        c.handle(Command::PointerUp).unwrap();
        assert_eq!(
            *c.windows.resizes.borrow(),
            vec![(window, PixelRect::new(0, 0, 600, 400))]
        );
        assert!(!c.is_visible());
        assert!(!c.is_dragging());
    }

    #[test]
    fn drag_up_left_resizes_window() {
        let mut c = make_controller();
        c.toggle().unwrap();
        drag(&mut c, Cell::new(3, 5), Cell::new(1, 2));
        c.on_pointer_up().unwrap();
        let resizes = c.windows.resizes.borrow();
        assert_eq!(resizes[0].1, PixelRect::new(200, 0, 800, 600));
    }

    #[test]
    fn click_without_move_selects_one_cell() {
        let mut c = make_controller();
        c.toggle().unwrap();
        c.on_pointer_down(Cell::new(4, 8)).unwrap();
        c.on_pointer_up().unwrap();
        assert_eq!(c.windows.resizes.borrow()[0].1, PixelRect::new(1400, 600, 200, 200));
    }

    #[test]
    fn pointer_events_broadcast_highlights() {
        let (mut c, rx) = with_overlay();
        c.toggle().unwrap();
        let _ = rx.try_iter().count();

        c.on_pointer_down(Cell::new(1, 1)).unwrap();
        c.on_pointer_move(Cell::new(2, 3));
        let events: Vec<OverlayEvent> = rx.try_iter().collect();
        let counts: Vec<usize> = events
            .iter()
            .map(|e| match e {
                OverlayEvent::Highlight(mask) => mask.selected_count(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(counts, vec![1, 6]);
    }

    #[test]
    fn repeated_move_to_same_cell_is_idempotent() {
        let (mut c, rx) = with_overlay();
        c.toggle().unwrap();
        c.on_pointer_down(Cell::new(1, 1)).unwrap();
        c.on_pointer_move(Cell::new(2, 2));
        let _ = rx.try_iter().count();

        c.on_pointer_move(Cell::new(2, 2));
        assert_eq!(rx.try_iter().count(), 0);
        assert!(c.is_dragging());
    }

    #[test]
    fn move_without_drag_is_ignored() {
        let (mut c, rx) = with_overlay();
        c.on_pointer_move(Cell::new(2, 2));
        c.toggle().unwrap();
        let _ = rx.try_iter().count();
        c.on_pointer_move(Cell::new(2, 2));
        assert_eq!(rx.try_iter().count(), 0);
        assert!(!c.is_dragging());
    }

    #[test]
    fn pointer_down_while_hidden_is_ignored() {
        let mut c = make_controller();
        c.on_pointer_down(Cell::new(1, 1)).unwrap();
        assert!(!c.is_dragging());
        assert!(!c.is_visible());
    }

    #[test]
    fn pointer_down_twice_is_invalid() {
        let mut c = make_controller();
        c.toggle().unwrap();
        c.on_pointer_down(Cell::new(1, 1)).unwrap();
        let err = c.on_pointer_down(Cell::new(2, 2)).unwrap_err();
        assert!(matches!(err, ControllerError::Selection(SelectionError::AlreadyDragging)));
    }

    #[test]
    fn pointer_up_without_drag_is_invalid() {
        let mut c = make_controller();
        c.toggle().unwrap();
        let err = c.on_pointer_up().unwrap_err();
        assert!(matches!(err, ControllerError::Selection(SelectionError::InvalidState)));
        assert!(c.windows.resizes.borrow().is_empty());
        // Overlay stays up; the user can still drag.
        assert!(c.is_visible());
    }

    #[test]
    fn pointer_up_hides_and_resets() {
        let (mut c, rx) = with_overlay();
        c.toggle().unwrap();
        drag(&mut c, Cell::new(1, 1), Cell::new(2, 2));
        let _ = rx.try_iter().count();
        c.on_pointer_up().unwrap();
        let events: Vec<OverlayEvent> = rx.try_iter().collect();
        assert_eq!(events, vec![OverlayEvent::Hide, OverlayEvent::Reset]);
    }

    #[test]
    fn pointer_down_outside_grid_is_ignored() {
        let (mut c, rx) = with_overlay();
        c.toggle().unwrap();
        let _ = rx.try_iter().count();

        let far: Command = serde_json::from_str(r#"{"PointerDown":{"row":50,"col":50}}"#).unwrap();
        c.handle(far).unwrap();
        let huge: Command = serde_json::from_str(r#"{"PointerDown":"4000000000 1"}"#).unwrap();
        c.handle(huge).unwrap();
        assert!(!c.is_dragging());
        assert_eq!(rx.try_iter().count(), 0);

        let err = c.handle(Command::PointerUp).unwrap_err();
        assert!(matches!(err, ControllerError::Selection(SelectionError::InvalidState)));
        assert!(c.windows.resizes.borrow().is_empty());
        assert!(c.is_visible());
    }

    #[test]
    fn pointer_move_outside_grid_keeps_last_cell() {
        let mut c = make_controller();
        c.toggle().unwrap();
        c.on_pointer_down(Cell::new(1, 1)).unwrap();
        c.on_pointer_move(Cell::new(2, 2));
        c.on_pointer_move(Cell::new(5, 1));
        c.on_pointer_move(Cell::new(1, 9));
        c.on_pointer_move(Cell::new(u32::MAX, u32::MAX));
        assert!(c.is_dragging());
        c.on_pointer_up().unwrap();
        assert_eq!(c.windows.resizes.borrow()[0].1, PixelRect::new(0, 0, 400, 400));
    }

    #[test]
    fn pointer_up_after_hiding_mid_drag_is_ignored() {
        let (mut c, rx) = with_overlay();
        c.toggle().unwrap();
        drag(&mut c, Cell::new(1, 1), Cell::new(2, 2));
        c.toggle().unwrap();
        let _ = rx.try_iter().count();

        c.handle(Command::PointerUp).unwrap();
        assert!(c.windows.resizes.borrow().is_empty());
        assert!(!c.is_visible());
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn no_active_window_keeps_overlay_hidden() {
        let (mut c, rx) = with_overlay();
        c.windows.no_active_window.set(true);
        let err = c.toggle().unwrap_err();
        assert!(matches!(err, ControllerError::NoActiveWindow(_)));
        assert!(!c.is_visible());
        assert!(c.active_window().is_none());
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn failed_resize_still_hides_and_resets() {
        let (mut c, rx) = with_overlay();
        c.windows.fail_resize.set(true);
        c.toggle().unwrap();
        drag(&mut c, Cell::new(1, 1), Cell::new(2, 3));
        let _ = rx.try_iter().count();

        let err = c.on_pointer_up().unwrap_err();
        assert!(matches!(err, ControllerError::Resize(_)));
        assert!(!c.is_visible());
        assert!(!c.is_dragging());
        let events: Vec<OverlayEvent> = rx.try_iter().collect();
        assert_eq!(events, vec![OverlayEvent::Hide, OverlayEvent::Reset]);

        // The next cycle works normally.
        c.windows.fail_resize.set(false);
        c.toggle().unwrap();
        c.on_pointer_down(Cell::new(1, 1)).unwrap();
        c.on_pointer_up().unwrap();
    }

    #[test]
    fn hiding_mid_drag_discards_selection() {
        let mut c = make_controller();
        c.toggle().unwrap();
        drag(&mut c, Cell::new(1, 1), Cell::new(4, 8));
        c.toggle().unwrap();
        assert!(!c.is_dragging());
        assert!(c.windows.resizes.borrow().is_empty());

        // A fresh selection is unaffected by the abandoned anchor.
        c.toggle().unwrap();
        c.on_pointer_down(Cell::new(3, 3)).unwrap();
        c.on_pointer_up().unwrap();
        assert_eq!(c.windows.resizes.borrow()[0].1, PixelRect::new(400, 400, 200, 200));
    }

    #[test]
    fn consecutive_drags_are_independent() {
        let mut c = make_controller();
        c.toggle().unwrap();
        drag(&mut c, Cell::new(1, 1), Cell::new(4, 8));
        c.on_pointer_up().unwrap();

        c.toggle().unwrap();
        drag(&mut c, Cell::new(2, 2), Cell::new(2, 3));
        c.on_pointer_up().unwrap();
        let resizes = c.windows.resizes.borrow();
        assert_eq!(resizes[0].1, PixelRect::new(0, 0, 1600, 800));
        assert_eq!(resizes[1].1, PixelRect::new(200, 200, 400, 200));
    }
}
