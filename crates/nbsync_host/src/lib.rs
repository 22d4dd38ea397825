//! Headless editor host: connects to a tool and mirrors its buffers in memory.
//!
//! A reader thread moves raw socket chunks over a channel; the main thread
//! owns the [`Connection`] and the editor and handles every chunk in order.

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver};
use nbsync_core::config::parse_env_flag;
use nbsync_core::constants::MAX_READ_SIZE;
use nbsync_core::{Config, Connection, MemoryEditor, Status};
use std::io::{self, Read};
use std::net::TcpStream;
use std::thread;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "nbsync-host", about = "Headless editor host for the nbsync protocol", version)]
pub struct Cli {
    /// Connection target: `=<info file>`, `:<host>:<port>:<password>`, or
    /// empty to use the environment
    #[arg(env = "NBSYNC_PARAMS", default_value = "")]
    pub params: String,

    /// Exit instead of returning an error when the tool cannot be reached
    #[arg(
        long,
        env = "NBSYNC_ABORT",
        action = clap::ArgAction::Set,
        value_parser = parse_flag,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub abort: bool,
}

fn parse_flag(value: &str) -> Result<bool, String> {
    parse_env_flag(value).ok_or_else(|| format!("expected a boolean, got '{}'", value))
}

/// Install the global subscriber: `RUST_LOG` filter, compact output.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nbsync_core=info,nbsync_host=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

/// What the reader thread saw on the socket.
#[derive(Debug)]
pub enum ReaderEvent {
    Data(Vec<u8>),
    Closed,
    Failed(io::Error),
}

/// Why the host stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostExit {
    /// The tool sent `DISCONNECT`.
    Disconnected,
    /// The tool sent `DETACH`.
    Detached,
    /// The socket closed or failed.
    Closed,
}

/// Spawn the thread that drains `reader` into a channel.
///
/// The thread ends after reporting end of input or a read error, or when the
/// receiving side is dropped.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> io::Result<Receiver<ReaderEvent>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("nbsync-reader".to_string())
        .spawn(move || {
            let mut chunk = vec![0u8; MAX_READ_SIZE];
            loop {
                let event = match reader.read(&mut chunk) {
                    Ok(0) => ReaderEvent::Closed,
                    Ok(n) => ReaderEvent::Data(chunk[..n].to_vec()),
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => ReaderEvent::Failed(err),
                };
                let last = !matches!(event, ReaderEvent::Data(_));
                if tx.send(event).is_err() || last {
                    break;
                }
            }
            debug!("reader thread finished");
        })?;
    Ok(rx)
}

/// Handle reader events until the connection ends.
pub fn drive(
    conn: &mut Connection<TcpStream>,
    editor: &mut MemoryEditor,
    events: &Receiver<ReaderEvent>,
) -> HostExit {
    for event in events.iter() {
        match event {
            ReaderEvent::Data(bytes) => match conn.receive(&bytes, editor) {
                Status::Connected => {}
                Status::DisconnectRequested => return HostExit::Disconnected,
                Status::Detached => return HostExit::Detached,
                Status::Closed => return HostExit::Closed,
            },
            ReaderEvent::Closed => {
                conn.input_closed(editor);
                return HostExit::Closed;
            }
            ReaderEvent::Failed(err) => {
                warn!(error = %err, "read from tool failed");
                conn.input_closed(editor);
                return HostExit::Closed;
            }
        }
    }
    conn.input_closed(editor);
    HostExit::Closed
}

/// Connect, then serve the tool until it disconnects.
///
/// # Errors
/// Fails when the connection cannot be established or the socket cannot be
/// handed to the reader thread.
pub fn run(cli: &Cli) -> anyhow::Result<HostExit> {
    let config = Config::from_env();
    let mut editor = MemoryEditor::new();
    let mut conn: Connection = Connection::new(config);
    conn.start(&cli.params, cli.abort, &mut editor, &|| false)
        .context("Failed to connect to tool")?;

    let reader = conn
        .try_clone_stream()
        .context("Failed to clone connection for reading")?;
    let events = spawn_reader(reader).context("Failed to spawn reader thread")?;
    let exit = drive(&mut conn, &mut editor, &events);

    for message in editor.errors() {
        debug!(message = %message, "host error");
    }
    info!(?exit, buffers = editor.buffer_count(), "host finished");
    Ok(exit)
}
