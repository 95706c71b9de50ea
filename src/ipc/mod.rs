//! IPC listener that accepts commands over a Unix socket.
//!
//! The window manager's key binding for the configured hotkey runs
//! `boxes --toggle`, which connects to the socket and sends a toggle.
//! Other tools can send any newline-delimited JSON [`Command`](crate::command::Command).

pub mod listener;
