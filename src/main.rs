//! Entry point for **boxes**.
//!
//! * `boxes` runs the daemon: it measures the screen, loads the config,
//!   listens for commands on a Unix socket and shows the overlay on demand.
//! * `boxes --toggle` asks a running daemon to show or hide the overlay.
//!   Bind this to the configured hotkey in your window manager.
//!
//! When the `visualizer-gtk` feature is enabled the main thread runs the
//! GLib main loop (GTK4 requires it) and polls the command channel from
//! there.  Without the feature, a simple blocking loop is used instead.

use boxes::command::Command;
use boxes::config::{Config, Settings};
use boxes::controller::GridOverlayController;
use boxes::ipc::listener::{send_command, UnixSocketListener};
use boxes::traits::{CommandSource, WindowHelper};
use boxes::xorg::XorgWindowHelper;
use log::{error, info};
use std::sync::mpsc;

/// Default socket path for the command listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/boxes.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/boxes`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("boxes")
}

/// Try to load the config from `$XDG_CONFIG_HOME/boxes/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no usable config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    if std::env::args().any(|a| a == "--toggle") {
        run_toggle();
    } else {
        run_daemon();
    }
}

/// Client mode: send a single toggle to the daemon.
fn run_toggle() {
    let path = default_socket_path();
    if let Err(e) = send_command(&path, Command::Toggle) {
        error!("could not reach boxes daemon at {}: {}", path, e);
        std::process::exit(1);
    }
}

/// Normal daemon mode.
fn run_daemon() {
    let config = load_config();

    let windows = XorgWindowHelper::new();
    let bounds = match windows.work_area() {
        Ok(b) => {
            info!("work area {}x{}", b.width, b.height);
            b
        }
        Err(e) => {
            error!("failed to query the screen work area: {}", e);
            std::process::exit(1);
        }
    };

    let settings = Settings::resolve(&config.grid, bounds);
    info!(
        "bind {} to `boxes --toggle` in your window manager",
        settings.hotkey
    );

    let controller = GridOverlayController::new(windows, &settings);

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx.clone());

    start_event_loop(controller, cmd_tx, cmd_rx, settings);
}

//  Event loops

#[cfg(feature = "visualizer-gtk")]
fn start_event_loop<W: WindowHelper + 'static>(
    controller: GridOverlayController<W>,
    cmd_tx: mpsc::Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
    settings: Settings,
) {
    boxes::visualizer::gtk::run_main_loop(controller, cmd_tx, cmd_rx, settings);
}

#[cfg(not(feature = "visualizer-gtk"))]
fn start_event_loop<W: WindowHelper>(
    mut controller: GridOverlayController<W>,
    cmd_tx: mpsc::Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
    _settings: Settings,
) {
    use boxes::traits::OverlayEvent;

    // Only the socket feeds commands here; keeping our sender would stop
    // the loop from ever seeing the channel close.
    drop(cmd_tx);

    let (overlay_tx, overlay_rx) = mpsc::channel::<OverlayEvent>();
    controller.set_overlay(overlay_tx);

    info!("boxes running without an overlay renderer");
    for cmd in cmd_rx {
        if let Err(e) = controller.handle(cmd) {
            error!("command error: {}", e);
        }
        for event in overlay_rx.try_iter() {
            info!("overlay: {:?}", event);
        }
    }
    info!("all command sources closed, exiting");
}

//  Helpers

fn spawn_command_sources(tx: mpsc::Sender<Command>) {
    let path = default_socket_path();
    std::thread::spawn(move || {
        let mut source = UnixSocketListener::new(&path);
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });
}
