//! GTK4 overlay that runs on the **main thread**.
//!
//! # Widget tree
//!
//! ```text
//! window.boxes                 (undecorated, titled "boxes")
//! └ .grid                      (GtkGrid, homogeneous)
//!     ├ .grid-cell             (one per cell, row-major)
//!     ├ .grid-cell.selected    (inside the live selection)
//!     └ …
//! ```
//!
//! Colors come from [`Settings::colors`] and are injected as CSS.
//!
//! Pointer input is a single [`gtk4::GestureDrag`] on the grid.  Its
//! coordinates are hit-tested with [`cell_at_spaced`] and pushed into the same
//! command channel the socket listener feeds, so the controller sees one
//! ordered stream of [`Command`]s.  Escape (or closing the window) sends a
//! toggle, which hides the overlay.

use crate::command::Command;
use crate::config::{Colors, Settings};
use crate::controller::{ControllerError, GridOverlayController};
use crate::geometry::{cell_at_spaced, GridDimensions, PixelRect};
use crate::traits::{CellMask, OverlayEvent, WindowHelper};
use crate::xorg::XorgWindowHelper;
use gtk4::prelude::*;
use gtk4::{gdk, glib};
use log::{debug, error, info, warn};
use std::sync::mpsc;
use std::time::Duration;

/// Title used to find the overlay with `wmctrl` when centering it.
const WINDOW_TITLE: &str = "boxes";

/// Delay between presenting the window and moving it, so the window
/// manager has mapped it.
const PLACE_DELAY: Duration = Duration::from_millis(40);

const CELL_SPACING: i32 = 4;

fn stylesheet(colors: &Colors) -> String {
    format!(
        r#"
window.boxes {{
    background-color: {background};
}}

.grid-cell {{
    background-color: {cell};
    border: 1px solid rgba(0, 0, 0, 0.25);
    border-radius: 2px;
}}

.grid-cell.selected {{
    background-color: {selected};
}}
"#,
        background = colors.background,
        cell = colors.cell,
        selected = colors.selected_cell,
    )
}

//  Cell grid

struct OverlayGrid {
    grid_widget: gtk4::Grid,
    cells: Vec<gtk4::Box>,
}

impl OverlayGrid {
    fn new(dimensions: GridDimensions) -> Self {
        let grid_widget = gtk4::Grid::new();
        grid_widget.add_css_class("grid");
        grid_widget.set_row_spacing(CELL_SPACING as u32);
        grid_widget.set_column_spacing(CELL_SPACING as u32);
        grid_widget.set_row_homogeneous(true);
        grid_widget.set_column_homogeneous(true);
        grid_widget.set_hexpand(true);
        grid_widget.set_vexpand(true);

        let mut cells = Vec::with_capacity(dimensions.len());
        for cell in dimensions.cells() {
            let widget = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
            widget.add_css_class("grid-cell");
            widget.set_hexpand(true);
            widget.set_vexpand(true);
            widget.set_can_target(false);
            grid_widget.attach(&widget, cell.col as i32 - 1, cell.row as i32 - 1, 1, 1);
            cells.push(widget);
        }

        Self { grid_widget, cells }
    }

    fn highlight(&self, mask: &CellMask) {
        for (cell, selected) in self.cells.iter().zip(mask.flags()) {
            if *selected {
                cell.add_css_class("selected");
            } else {
                cell.remove_css_class("selected");
            }
        }
    }

    fn reset(&self) {
        for cell in &self.cells {
            cell.remove_css_class("selected");
        }
    }
}

/// Forward pointer drags on `grid` as pointer commands.
fn attach_drag(grid: &gtk4::Grid, dimensions: GridDimensions, tx: &mpsc::Sender<Command>) {
    let drag = gtk4::GestureDrag::new();

    let hit = {
        let grid = grid.clone();
        move |x: f64, y: f64| {
            cell_at_spaced(
                x,
                y,
                dimensions,
                grid.width() as f64,
                grid.height() as f64,
                CELL_SPACING as f64,
            )
        }
    };

    {
        let tx = tx.clone();
        let hit = hit.clone();
        drag.connect_drag_begin(move |_, x, y| {
            let _ = tx.send(Command::PointerDown(hit(x, y)));
        });
    }
    {
        let tx = tx.clone();
        drag.connect_drag_update(move |gesture, dx, dy| {
            if let Some((x, y)) = gesture.start_point() {
                let _ = tx.send(Command::PointerMove(hit(x + dx, y + dy)));
            }
        });
    }
    {
        let tx = tx.clone();
        drag.connect_drag_end(move |_, _, _| {
            let _ = tx.send(Command::PointerUp);
        });
    }

    grid.add_controller(drag);
}

/// Escape hides the overlay.
fn attach_escape(window: &gtk4::Window, tx: &mpsc::Sender<Command>) {
    let keys = gtk4::EventControllerKey::new();
    let tx = tx.clone();
    keys.connect_key_pressed(move |_, key, _, _| {
        if key == gdk::Key::Escape {
            let _ = tx.send(Command::Toggle);
            glib::Propagation::Stop
        } else {
            glib::Propagation::Proceed
        }
    });
    window.add_controller(keys);
}

fn place(frame: PixelRect) {
    glib::timeout_add_local_once(PLACE_DELAY, move || {
        if let Err(e) = XorgWindowHelper::new().place_window_by_title(WINDOW_TITLE, frame) {
            warn!("could not center overlay: {}", e);
        }
    });
}

//  Public API

/// Run the GTK4 main loop on the **current** (main) thread.
///
/// `cmd_tx` is the sending half of `cmd_rx`; the overlay uses it to inject
/// pointer and key commands.
pub fn run_main_loop<W: WindowHelper + 'static>(
    mut controller: GridOverlayController<W>,
    cmd_tx: mpsc::Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
    settings: Settings,
) {
    gtk4::init().expect("failed to initialise GTK4");
    info!("GTK4 initialised on main thread");

    load_css(&settings.colors);

    //  Overlay window
    let window = gtk4::Window::new();
    window.set_title(Some(WINDOW_TITLE));
    window.set_decorated(false);
    window.set_resizable(false);
    window.add_css_class("boxes");
    window.set_default_size(settings.frame_width as i32, settings.frame_height as i32);

    let overlay_grid = OverlayGrid::new(settings.dimensions);
    window.set_child(Some(&overlay_grid.grid_widget));

    attach_drag(&overlay_grid.grid_widget, settings.dimensions, &cmd_tx);
    attach_escape(&window, &cmd_tx);
    {
        let tx = cmd_tx.clone();
        window.connect_close_request(move |_| {
            let _ = tx.send(Command::Toggle);
            glib::Propagation::Stop
        });
    }
    drop(cmd_tx);

    //  Overlay channel
    let (overlay_tx, overlay_rx) = mpsc::channel::<OverlayEvent>();
    controller.set_overlay(overlay_tx);

    info!(
        "overlay ready: {}x{} grid, frame {}x{}, hotkey {}",
        settings.dimensions.columns(),
        settings.dimensions.rows(),
        settings.frame_width,
        settings.frame_height,
        settings.hotkey,
    );

    //  Main event loop (~60 fps)
    glib::timeout_add_local(Duration::from_millis(16), move || {
        // 1. Drain commands.
        while let Ok(cmd) = cmd_rx.try_recv() {
            match controller.handle(cmd) {
                Ok(()) => {}
                Err(e @ ControllerError::NoActiveWindow(_)) => warn!("{}", e),
                Err(e) => error!("command error: {}", e),
            }
        }

        // 2. Drain overlay events.
        while let Ok(event) = overlay_rx.try_recv() {
            match event {
                OverlayEvent::Show { frame } => {
                    debug!("SHOW {}", frame);
                    window.set_default_size(frame.width as i32, frame.height as i32);
                    window.set_visible(true);
                    window.present();
                    place(frame);
                }
                OverlayEvent::Hide => {
                    debug!("HIDE");
                    window.set_visible(false);
                }
                OverlayEvent::Highlight(mask) => overlay_grid.highlight(&mask),
                OverlayEvent::Reset => overlay_grid.reset(),
            }
        }

        glib::ControlFlow::Continue
    });

    info!("entering GLib main loop");
    let main_loop = glib::MainLoop::new(None, false);
    main_loop.run();
    info!("GLib main loop exited");
}

//  CSS loading

fn load_css(colors: &Colors) {
    let provider = gtk4::CssProvider::new();

    #[allow(deprecated)]
    provider.load_from_data(&stylesheet(colors));

    if let Some(display) = gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
        info!("CSS registered on display");
    } else {
        warn!("no GDK display; CSS will not be applied");
    }
}
