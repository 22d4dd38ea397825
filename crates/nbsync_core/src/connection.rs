//! Connection manager: socket lifecycle, read path and write path.
//!
//! A [`Connection`] owns the link to the tool and the [`Session`] driving it.
//! The host feeds it received bytes (or lets it read from a reader), and every
//! call that may produce output writes the session outbox before returning.

use crate::config::{Config, ConnectTarget};
use crate::constants::MAX_READ_SIZE;
use crate::editor::Editor;
use crate::error::{ConnectError, SyncError};
use crate::inbound::InboundQueue;
use crate::session::{Control, Session};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;
use tracing::{debug, error, info, warn};

/// Writable side of a connection.
pub trait Link: Write {
    /// Close the link so readers on other handles see end of input.
    fn shutdown(&mut self) {}
}

impl Link for TcpStream {
    fn shutdown(&mut self) {
        if let Err(err) = TcpStream::shutdown(self, Shutdown::Both) {
            debug!(error = %err, "socket shutdown failed");
        }
    }
}

/// Connection state after handling input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Connected,
    /// The tool sent `DETACH`.
    Detached,
    /// The tool sent `DISCONNECT`; the host should exit.
    DisconnectRequested,
    /// End of input, a read error or a failed write.
    Closed,
}

/// One connection to the tool.
pub struct Connection<L: Link = TcpStream> {
    link: Option<L>,
    session: Session,
    inbound: InboundQueue,
    write_error_reported: bool,
    config: Config,
}

impl<L: Link> Connection<L> {
    pub fn new(config: Config) -> Self {
        Self {
            link: None,
            session: Session::new(),
            inbound: InboundQueue::new(),
            write_error_reported: false,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Take over an established link: authenticate and start watching input.
    pub fn attach(&mut self, link: L, token: &str, editor: &mut dyn Editor) {
        self.session.reset();
        self.inbound.clear();
        self.link = Some(link);
        self.session.handshake(token);
        editor.input_watch(true);
        info!("connected to tool");
        self.flush(editor);
    }

    /// Run `f` against the session (usually to queue an event), then write
    /// whatever it queued.
    pub fn with_session<T>(
        &mut self,
        editor: &mut dyn Editor,
        f: impl FnOnce(&mut Session, &mut dyn Editor) -> T,
    ) -> T {
        let result = f(&mut self.session, editor);
        self.flush(editor);
        result
    }

    /// Handle a chunk of received bytes.
    ///
    /// Complete lines are dispatched in order; a trailing partial line waits
    /// for the next chunk.
    pub fn receive(&mut self, bytes: &[u8], editor: &mut dyn Editor) -> Status {
        if !self.is_connected() {
            debug!(bytes = bytes.len(), "input while not connected");
            return Status::Closed;
        }
        self.inbound.feed(bytes);
        while let Some(line) = self.inbound.next_line() {
            let control = self.session.handle_bytes(&line, editor);
            self.flush(editor);
            match control {
                Control::Continue if self.is_connected() => {}
                Control::Continue => return Status::Closed,
                Control::Disconnect => {
                    info!("tool requested disconnect");
                    self.close(editor);
                    return Status::DisconnectRequested;
                }
                Control::Detach => {
                    info!("tool detached");
                    self.close(editor);
                    return Status::Detached;
                }
            }
        }
        Status::Connected
    }

    /// Read and handle everything currently available from `reader`.
    ///
    /// Reads in chunks of at most [`MAX_READ_SIZE`] bytes and stops after a
    /// short read or when the reader would block. End of input and read
    /// errors close the connection.
    pub fn pump<R: Read>(&mut self, reader: &mut R, editor: &mut dyn Editor) -> Status {
        let mut chunk = [0u8; MAX_READ_SIZE];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => {
                    self.input_closed(editor);
                    return Status::Closed;
                }
                Ok(n) => {
                    let status = self.receive(&chunk[..n], editor);
                    if status != Status::Connected || n < MAX_READ_SIZE {
                        return status;
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Status::Connected,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    error!(error = %err, "read from tool failed");
                    editor.report_error(&SyncError::Io(err).to_string());
                    self.input_closed(editor);
                    return Status::Closed;
                }
            }
        }
    }

    /// The tool closed its end: tear down without saying goodbye.
    pub fn input_closed(&mut self, editor: &mut dyn Editor) {
        if let Some(mut link) = self.link.take() {
            info!("tool closed the connection");
            link.shutdown();
            self.teardown(editor);
        }
    }

    /// Write all queued lines.
    ///
    /// # Returns
    /// `false` when a write failed; the connection is closed in that case.
    /// Only the first of consecutive failures is reported to the host.
    pub fn flush(&mut self, editor: &mut dyn Editor) -> bool {
        if !self.session.has_output() {
            return true;
        }
        let lines = self.session.drain_outbox();
        let Some(link) = self.link.as_mut() else {
            warn!(
                error = %SyncError::NotConnected("flush"),
                dropped = lines.len(),
                "discarding output"
            );
            return false;
        };

        match write_lines(link, &lines) {
            Ok(()) => {
                self.write_error_reported = false;
                true
            }
            Err(err) => {
                if !self.write_error_reported {
                    error!(error = %err, "write to tool failed");
                    editor.report_error(&SyncError::Io(err).to_string());
                    self.write_error_reported = true;
                }
                if let Some(mut link) = self.link.take() {
                    link.shutdown();
                }
                self.teardown(editor);
                false
            }
        }
    }

    /// Say goodbye, close the link and forget all protocol state.
    pub fn close(&mut self, editor: &mut dyn Editor) {
        if !self.is_connected() {
            return;
        }
        self.session.disconnect_line();
        self.write_quietly();
        if let Some(mut link) = self.link.take() {
            link.shutdown();
        }
        self.teardown(editor);
        info!("connection closed");
    }

    /// Announce that the host is exiting: every registered buffer is
    /// reported killed (and unmodified first on a forced quit).
    pub fn end(&mut self, forced_quit: bool) {
        if !self.is_connected() {
            return;
        }
        self.session.farewell(forced_quit);
        self.write_quietly();
    }

    fn write_quietly(&mut self) {
        let lines = self.session.drain_outbox();
        if let Some(link) = self.link.as_mut() {
            if let Err(err) = write_lines(link, &lines) {
                debug!(error = %err, "ignoring write failure while closing");
            }
        }
    }

    fn teardown(&mut self, editor: &mut dyn Editor) {
        self.session.reset();
        self.inbound.clear();
        editor.unplace_all_signs();
        editor.input_watch(false);
        editor.redraw();
    }
}

impl Connection<TcpStream> {
    /// Connect to the tool named by `params` and authenticate.
    ///
    /// A refused connection is retried every [`Config::retry_interval`] up to
    /// [`Config::max_retries`] times. Without `abort_on_failure` the
    /// `interrupted` probe is checked between attempts.
    ///
    /// # Errors
    /// Returns [`ConnectError`] when already connected, when the target
    /// cannot be resolved, or when connecting fails. With `abort_on_failure`
    /// a connect failure exits the process instead.
    pub fn start(
        &mut self,
        params: &str,
        abort_on_failure: bool,
        editor: &mut dyn Editor,
        interrupted: &dyn Fn() -> bool,
    ) -> Result<(), ConnectError> {
        if self.is_connected() {
            return Err(ConnectError::AlreadyConnected);
        }
        let target = ConnectTarget::resolve(params)?;
        match self.connect(&target, abort_on_failure, interrupted) {
            Ok(stream) => {
                if let Err(err) = stream.set_nodelay(true) {
                    debug!(error = %err, "cannot disable Nagle");
                }
                self.attach(stream, &target.password, editor);
                Ok(())
            }
            Err(err) if abort_on_failure => {
                error!(error = %err, "cannot connect to tool, exiting");
                editor.report_error(&err.to_string());
                std::process::exit(1);
            }
            Err(err) => {
                warn!(error = %err, "cannot connect to tool");
                Err(err)
            }
        }
    }

    fn connect(
        &self,
        target: &ConnectTarget,
        abort_on_failure: bool,
        interrupted: &dyn Fn() -> bool,
    ) -> Result<TcpStream, ConnectError> {
        let address = target.address();
        let mut attempts = 0u32;
        loop {
            match TcpStream::connect(&address) {
                Ok(stream) => return Ok(stream),
                Err(err) if err.kind() == ErrorKind::ConnectionRefused => {
                    attempts += 1;
                    if attempts > self.config.max_retries {
                        return Err(ConnectError::RetriesExhausted {
                            target: address,
                            attempts,
                        });
                    }
                    if !abort_on_failure && interrupted() {
                        return Err(ConnectError::Interrupted(address));
                    }
                    debug!(%address, attempts, "connection refused, retrying");
                    thread::sleep(self.config.retry_interval());
                }
                Err(source) => {
                    return Err(ConnectError::Io {
                        target: address,
                        source,
                    })
                }
            }
        }
    }

    /// Second handle on the socket for a reader thread.
    ///
    /// # Errors
    /// Fails when not connected or when the socket cannot be cloned.
    pub fn try_clone_stream(&self) -> io::Result<TcpStream> {
        match self.link.as_ref() {
            Some(stream) => stream.try_clone(),
            None => Err(io::Error::new(ErrorKind::NotConnected, "not connected")),
        }
    }
}

fn write_lines<W: Write>(link: &mut W, lines: &[String]) -> io::Result<()> {
    for line in lines {
        debug!(line = %line, "send");
        link.write_all(line.as_bytes())?;
        link.write_all(b"\n")?;
    }
    link.flush()
}
