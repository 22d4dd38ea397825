//! Routing of framed lines to verb handlers.

use super::Session;
use crate::buffers::BufferRegistry;
use crate::editor::{BufferHandle, Editor};
use crate::error::{CommandError, FrameError};
use crate::wire::{self, Args, CallKind, Inbound};
use tracing::{debug, warn};

/// What the connection should do after a line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// `DISCONNECT`: close and let the host exit.
    Disconnect,
    /// `DETACH`: close only.
    Detach,
}

/// Call forms a verb accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Form {
    Command,
    Function,
    Either,
}

impl Form {
    fn accepts(self, kind: CallKind) -> bool {
        matches!(
            (self, kind),
            (Form::Either, _)
                | (Form::Command, CallKind::Command)
                | (Form::Function, CallKind::Function)
        )
    }
}

/// Buffer a verb needs before its handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// The buffer number is ignored or optional.
    Any,
    /// A protocol id >= 1; the entry is created on demand.
    Entry,
    /// An entry bound to a host buffer.
    Loaded,
    /// Like `Loaded`, but a missing buffer is only logged.
    LoadedQuiet,
}

pub(crate) type HandlerFn =
    fn(&mut Session, &mut dyn Editor, &mut Request<'_>) -> Result<Reply, CommandError>;

pub(crate) struct Handler {
    pub form: Form,
    pub target: Target,
    pub run: HandlerFn,
}

impl Handler {
    pub const fn new(form: Form, target: Target, run: HandlerFn) -> Self {
        Self { form, target, run }
    }
}

/// Result carried back to function calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reply {
    Nil,
    Number(i64),
    /// Already formatted (and quoted where the verb requires it).
    Text(String),
}

/// One command being executed.
pub(crate) struct Request<'a> {
    pub verb: &'static str,
    pub bufno: Option<u32>,
    pub handle: Option<BufferHandle>,
    pub args: Args<'a>,
    /// Set by handlers that changed something visible.
    pub update: bool,
}

impl Request<'_> {
    /// Protocol id of the addressed buffer.
    pub fn bufno(&self) -> Result<u32, CommandError> {
        self.bufno
            .ok_or(CommandError::InvalidBuffer { verb: self.verb })
    }

    /// Protocol id and host buffer of the addressed buffer.
    pub fn loaded(&self) -> Result<(u32, BufferHandle), CommandError> {
        match (self.bufno, self.handle) {
            (Some(bufno), Some(handle)) => Ok((bufno, handle)),
            _ => Err(CommandError::InvalidBuffer { verb: self.verb }),
        }
    }

    pub fn bad_argument(&self) -> CommandError {
        CommandError::BadArgument { verb: self.verb }
    }
}

impl Session {
    /// Handle one complete inbound line.
    ///
    /// Framing errors are reported and the line is dropped; the connection
    /// always continues unless the line was `DISCONNECT` or `DETACH`.
    pub fn handle_line(&mut self, line: &str, editor: &mut dyn Editor) -> Control {
        match wire::parse_line(line) {
            Ok(Inbound::Disconnect) => Control::Disconnect,
            Ok(Inbound::Detach) => Control::Detach,
            Ok(Inbound::Call(call)) => {
                self.dispatch(call, editor);
                Control::Continue
            }
            Err(err) => {
                self.report_frame_error(&err, editor);
                Control::Continue
            }
        }
    }

    /// Handle one complete inbound line as received from the socket.
    ///
    /// A line that is not valid UTF-8 is a framing error: it is reported and
    /// dropped without a reply, so byte offsets the tool sends later still
    /// match the buffer contents.
    pub fn handle_bytes(&mut self, line: &[u8], editor: &mut dyn Editor) -> Control {
        match std::str::from_utf8(line) {
            Ok(text) => self.handle_line(text, editor),
            Err(_) => {
                let err = FrameError::InvalidUtf8(String::from_utf8_lossy(line).into_owned());
                self.report_frame_error(&err, editor);
                Control::Continue
            }
        }
    }

    fn report_frame_error(&mut self, err: &FrameError, editor: &mut dyn Editor) {
        warn!(error = %err, "dropping malformed line");
        editor.report_error(&err.to_string());
    }

    fn dispatch(&mut self, call: wire::RawCall<'_>, editor: &mut dyn Editor) {
        let is_function = call.kind == CallKind::Function;
        let seqno = call.seqno;
        debug!(
            bufno = call.bufno,
            verb = call.verb,
            seqno,
            function = is_function,
            "received"
        );

        let found = self
            .handlers
            .get_key_value(call.verb)
            .filter(|(_, h)| h.form.accepts(call.kind))
            .map(|(&verb, h)| (verb, h.target, h.run));
        let Some((verb, target, run)) = found else {
            if is_function {
                debug!(verb = call.verb, "unimplemented function");
                self.reply(seqno, Reply::Nil);
            } else {
                debug!(verb = call.verb, "ignoring unrecognised command");
            }
            return;
        };

        let bufno = BufferRegistry::id_of(call.bufno);
        let handle = bufno.and_then(|id| {
            if target == Target::Any {
                self.buffers.get(id).and_then(|e| e.handle)
            } else {
                self.buffers.entry(id).handle
            }
        });

        let missing = match target {
            Target::Any => false,
            Target::Entry => bufno.is_none(),
            Target::Loaded | Target::LoadedQuiet => handle.is_none(),
        };
        if missing {
            let err = CommandError::InvalidBuffer { verb };
            if target == Target::LoadedQuiet {
                debug!(verb, bufno = call.bufno, "no buffer for command");
            } else {
                self.report(&err, editor);
            }
            if is_function {
                self.reply(seqno, Reply::Nil);
            }
            return;
        }

        let mut request = Request {
            verb,
            bufno,
            handle,
            args: Args::new(call.args),
            update: false,
        };
        let outcome = run(self, editor, &mut request);
        if request.update {
            self.request_update(editor);
        }

        match outcome {
            Ok(reply) => {
                if is_function {
                    self.reply(seqno, reply);
                }
            }
            Err(err) => {
                let reply = match err.reply_text() {
                    Some(text) => {
                        debug!(verb, error = %err, "replying with error");
                        Reply::Text(text.to_string())
                    }
                    None => {
                        self.report(&err, editor);
                        Reply::Nil
                    }
                };
                if is_function {
                    self.reply(seqno, reply);
                }
            }
        }
    }

    fn report(&mut self, err: &CommandError, editor: &mut dyn Editor) {
        warn!(error = %err, "command failed");
        editor.report_error(&err.to_string());
    }

    pub(crate) fn reply(&mut self, seqno: i64, reply: Reply) {
        let line = match reply {
            Reply::Nil => format!("{}", seqno),
            Reply::Number(n) => format!("{} {}", seqno, n),
            Reply::Text(text) => format!("{} {}", seqno, text),
        };
        self.push_line(line);
    }
}
