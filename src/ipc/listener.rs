//! Unix-socket [`CommandSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.
//! Each line received is parsed as a JSON-encoded [`Command`].
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! "Toggle"
//! {"PointerDown":{"row":1,"col":1}}
//! {"PointerMove":"2 3"}
//! "PointerUp"
//! ```

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// A [`CommandSource`] that listens on a Unix stream socket for
/// JSON-encoded commands.
///
/// Each accepted connection can send multiple newline-delimited JSON
/// commands.  When the connection closes, the listener waits for the
/// next one.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener and client.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](CommandSource::run) is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** until the sink is dropped.  Run it on a
    /// dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        // A previous daemon may have left its socket file behind.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        for conn in listener.incoming() {
            let stream = match conn {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    continue;
                }
            };
            if let Delivery::SinkClosed = forward_commands(stream, &sink) {
                info!("command channel closed, listener stopping");
                return Ok(());
            }
        }
        Ok(())
    }
}

/// What happened to one client connection.
#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    /// The client hung up (or its stream failed); wait for the next one.
    ClientDone,
    /// Nobody consumes commands any more.
    SinkClosed,
}

/// Forward every command line from one client into `sink`.
fn forward_commands(stream: UnixStream, sink: &mpsc::Sender<Command>) -> Delivery {
    debug!("client connected");
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("dropping client after read error: {}", e);
                break;
            }
        };
        let Some(cmd) = parse_line(&line) else {
            continue;
        };
        if sink.send(cmd).is_err() {
            return Delivery::SinkClosed;
        }
    }
    debug!("client disconnected");
    Delivery::ClientDone
}

/// Decode one wire line.  Blank lines are skipped; lines that do not decode
/// are logged and dropped so one bad client line cannot stop the daemon.
fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Command>(line) {
        Ok(cmd) => {
            debug!("received {:?}", cmd);
            Some(cmd)
        }
        Err(e) => {
            error!("ignoring malformed command {:?}: {}", line, e);
            None
        }
    }
}

/// Connect to a running listener at `path` and send one command.
pub fn send_command(path: impl AsRef<Path>, cmd: Command) -> Result<(), UnixSocketError> {
    let mut stream = UnixStream::connect(path)?;
    let line = serde_json::to_string(&cmd)?;
    writeln!(stream, "{}", line)?;
    stream.shutdown(std::net::Shutdown::Write)?;
    Ok(())
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Cell;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Monotonic counter to generate unique socket paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    /// Helper: create a unique temporary socket path for each test.
    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir();
        dir.join(format!("boxes-test-{}-{}.sock", std::process::id(), id))
    }

    fn spawn_listener(path: &Path) -> mpsc::Receiver<Command> {
        let (tx, rx) = mpsc::channel();
        let path = path.to_path_buf();
        std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path);
            let _ = listener.run(tx);
        });
        // Give the listener a moment to bind.
        std::thread::sleep(std::time::Duration::from_millis(150));
        rx
    }

    #[test]
    fn parse_line_skips_blank_and_malformed() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   \t"), None);
        assert_eq!(parse_line("{\"PointerDown\":"), None);
        assert_eq!(parse_line(r#"{"PointerDown":"0 3"}"#), None);
        assert_eq!(parse_line(r#"  "Toggle"  "#), Some(Command::Toggle));
        assert_eq!(
            parse_line(r#"{"PointerMove":{"row":2,"col":5}}"#),
            Some(Command::PointerMove(Cell::new(2, 5)))
        );
    }

    #[test]
    fn forward_stops_when_sink_is_closed() {
        let (client, server) = UnixStream::pair().unwrap();
        {
            let mut client = client;
            writeln!(client, r#""Toggle""#).unwrap();
        }
        let (tx, rx) = mpsc::channel();
        drop(rx);
        assert_eq!(forward_commands(server, &tx), Delivery::SinkClosed);
    }

    #[test]
    fn forward_reports_client_done_on_hangup() {
        let (client, server) = UnixStream::pair().unwrap();
        {
            let mut client = client;
            writeln!(client, r#""Toggle""#).unwrap();
            writeln!(client, "garbage").unwrap();
            writeln!(client, r#""PointerUp""#).unwrap();
        }
        let (tx, rx) = mpsc::channel();
        assert_eq!(forward_commands(server, &tx), Delivery::ClientDone);
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(cmds, vec![Command::Toggle, Command::PointerUp]);
    }

    #[test]
    fn round_trip_commands_over_socket() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, r#""Toggle""#).unwrap();
            writeln!(stream, r#"{{"PointerDown":{{"row":1,"col":2}}}}"#).unwrap();
            writeln!(stream).unwrap();
            writeln!(stream, r#"{{"PointerMove":"2 3"}}"#).unwrap();
            writeln!(stream, r#""PointerUp""#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        std::thread::sleep(std::time::Duration::from_millis(150));
        let cmds: Vec<Command> = rx.try_iter().collect();

        assert_eq!(
            cmds,
            vec![
                Command::Toggle,
                Command::PointerDown(Cell::new(1, 2)),
                Command::PointerMove(Cell::new(2, 3)),
                Command::PointerUp,
            ]
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_json_does_not_crash() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, "not json at all").unwrap();
            writeln!(stream, r#""Toggle""#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        std::thread::sleep(std::time::Duration::from_millis(150));
        let cmds: Vec<Command> = rx.try_iter().collect();
        // Only the valid command should have arrived.
        assert_eq!(cmds, vec![Command::Toggle]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn send_command_reaches_listener() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        send_command(&path, Command::Toggle).unwrap();
        send_command(&path, Command::PointerDown(Cell::new(4, 8))).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(150));
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(cmds, vec![Command::Toggle, Command::PointerDown(Cell::new(4, 8))]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn send_command_without_listener_fails() {
        let path = tmp_socket_path();
        assert!(matches!(
            send_command(&path, Command::Toggle),
            Err(UnixSocketError::Io(_))
        ));
    }
}
