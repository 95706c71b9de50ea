//! [`WindowHelper`] implementation for X11 window managers.
//!
//! Uses the EWMH-aware command line tools `xprop` (to read root window
//! properties) and `wmctrl` (to move and resize clients), so it works with
//! any window manager that honours `_NET_MOVERESIZE_WINDOW`.  Each call is a
//! short-lived child process; nothing is kept open between calls.

use crate::geometry::{PixelRect, ScreenBounds};
use crate::traits::{WindowHelper, WindowId};
use log::debug;
use std::process::Command;

/// X11 window helper driving `xprop` and `wmctrl`.
#[derive(Debug, Default, Clone, Copy)]
pub struct XorgWindowHelper;

/// Errors that can occur when talking to the X server through its tools.
#[derive(Debug, thiserror::Error)]
pub enum XorgError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("no window is focused")]
    NoActiveWindow,
    #[error("unexpected {program} output: {output:?}")]
    Parse {
        program: &'static str,
        output: String,
    },
}

impl XorgWindowHelper {
    /// Create a new helper.
    pub fn new() -> Self {
        Self
    }

    /// Size of the usable desktop area (`_NET_WORKAREA`), i.e. the screen
    /// minus panels and docks.
    pub fn work_area(&self) -> Result<ScreenBounds, XorgError> {
        let output = run("xprop", &["-root", "_NET_WORKAREA"])?;
        parse_work_area(&output).ok_or(XorgError::Parse {
            program: "xprop",
            output,
        })
    }

    /// Move and resize the first window whose title contains `title`.
    ///
    /// Used to place the overlay itself, since GTK4 cannot position its own
    /// toplevels on X11.
    pub fn place_window_by_title(&self, title: &str, rect: PixelRect) -> Result<(), XorgError> {
        run("wmctrl", &["-r", title, "-e", &move_resize_arg(rect)]).map(|_| ())
    }
}

impl WindowHelper for XorgWindowHelper {
    type Error = XorgError;

    fn active_window(&self) -> Result<WindowId, Self::Error> {
        let output = run("xprop", &["-root", "32x", "\t$0", "_NET_ACTIVE_WINDOW"])?;
        parse_active_window(&output)
    }

    fn resize_window(&self, id: &WindowId, rect: PixelRect) -> Result<(), Self::Error> {
        // A maximized window ignores move/resize requests.
        run(
            "wmctrl",
            &["-i", "-r", id.as_str(), "-b", "remove,maximized_vert,maximized_horz"],
        )?;
        run("wmctrl", &["-i", "-r", id.as_str(), "-e", &move_resize_arg(rect)])?;
        Ok(())
    }
}

//  Process helpers

/// Run `program` with `args` and return its stdout.
fn run(program: &'static str, args: &[&str]) -> Result<String, XorgError> {
    debug!("exec {} {:?}", program, args);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| XorgError::Spawn { program, source })?;
    if !output.status.success() {
        return Err(XorgError::CommandFailed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `wmctrl -e` argument: gravity 0 (the window's default), then geometry.
fn move_resize_arg(rect: PixelRect) -> String {
    format!("0,{},{},{},{}", rect.x, rect.y, rect.width, rect.height)
}

//  Output parsing

/// Parse `_NET_ACTIVE_WINDOW(WINDOW)\t0x3a00007`.
///
/// The root property is `0x0` (or missing) when nothing has focus.
fn parse_active_window(output: &str) -> Result<WindowId, XorgError> {
    let id = output
        .split('\t')
        .nth(1)
        .map(str::trim)
        .ok_or_else(|| XorgError::Parse {
            program: "xprop",
            output: output.to_string(),
        })?;
    let hex = id.strip_prefix("0x").ok_or_else(|| XorgError::Parse {
        program: "xprop",
        output: output.to_string(),
    })?;
    match u64::from_str_radix(hex, 16) {
        Ok(0) => Err(XorgError::NoActiveWindow),
        Ok(_) => Ok(WindowId::new(id)),
        Err(_) => Err(XorgError::Parse {
            program: "xprop",
            output: output.to_string(),
        }),
    }
}

/// Parse `_NET_WORKAREA(CARDINAL) = 0, 27, 1920, 1053, ...` into the
/// width and height of the first desktop's work area.
fn parse_work_area(output: &str) -> Option<ScreenBounds> {
    let (_, values) = output.split_once('=')?;
    let mut cardinals = values.split(',').map(|v| v.trim().parse::<u32>());
    let _x = cardinals.next()?.ok()?;
    let _y = cardinals.next()?.ok()?;
    let width = cardinals.next()?.ok()?;
    let height = cardinals.next()?.ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(ScreenBounds::new(width, height))
}
