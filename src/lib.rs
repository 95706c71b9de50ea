//! **boxes** — grid-based window placement.
//!
//! A hotkey pops up a small overlay showing a fixed `columns × rows` grid
//! that stands for the whole desktop.  Dragging across the grid selects a
//! block of cells; on release the window that was focused when the overlay
//! appeared is moved and resized to cover the matching part of the screen.
//!
//! # Architecture
//!
//! * [`geometry`] — pure cell/pixel arithmetic.
//! * [`selection`] — the drag state machine.
//! * [`controller::GridOverlayController`] — turns [`command::Command`]s
//!   into selection updates, overlay events and window resizes.
//!
//! The controller only talks to the outside world through two traits:
//!
//! * [`traits::WindowHelper`] — query and resize windows; implemented for
//!   X11 in [`xorg`].
//! * [`traits::CommandSource`] — deliver the hotkey trigger; implemented as
//!   a Unix-socket listener in [`ipc`].
//!
//! # Binding the hotkey
//!
//! boxes never grabs keys.  The `hotkey` config option is parsed and
//! logged at startup, but the key itself has to be bound in the window
//! manager (or `xbindkeys`, `sxhkd`, ...) to run `boxes --toggle`, which
//! sends a `"Toggle"` command to the daemon's socket.  For the default
//! `Alt+R` under i3:
//!
//! ```text
//! bindsym Mod1+r exec --no-startup-id boxes --toggle
//! ```

pub mod command;
pub mod config;
pub mod controller;
pub mod geometry;
pub mod ipc;
pub mod selection;
pub mod traits;
pub mod visualizer;
pub mod xorg;
