//! Error types for framing, command execution, configuration and connection.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A received line that does not follow the command grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("missing colon: {0}")]
    MissingColon(String),

    #[error("missing ! or / in: {0}")]
    MissingSeparator(String),

    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Failure of a single dispatched command.
///
/// The connection always stays up; the error only aborts the command that
/// raised it and decides which reply a function call receives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("invalid buffer identifier in {verb}")]
    InvalidBuffer { verb: &'static str },

    #[error("bad position")]
    BadPosition,

    #[error("bad count")]
    BadCount,

    #[error("no such position in {verb}: {offset}")]
    NoSuchPosition { verb: &'static str, offset: i64 },

    #[error("missing or malformed argument in {verb}")]
    BadArgument { verb: &'static str },

    #[error("file {0} not found in setBufferNumber")]
    FileNotFound(String),

    #[error("highlighting color name too long in defineAnnoType")]
    ColorTooLong,

    #[error("annotation type {0} is not defined for this buffer")]
    UnknownAnnoType(i64),

    #[error("annotation id {0} collides with the guarded-region id space")]
    AnnotationIdReserved(u32),

    #[error("connection lost for buffer {0}")]
    ConnectionLost(u32),

    #[error("write of buffer {bufno} failed: {message}")]
    WriteFailed { bufno: u32, message: String },
}

impl CommandError {
    /// Reply text for function calls, when the error has one.
    ///
    /// # Returns
    /// The already-quoted result for `remove` position errors; `None` means the
    /// caller replies with an empty (nil) result.
    pub fn reply_text(&self) -> Option<&'static str> {
        match self {
            Self::BadPosition => Some("!bad position"),
            Self::BadCount => Some("!bad count"),
            _ => None,
        }
    }
}

/// Invalid connection target settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot open connection info file {path}: {source}")]
    InfoFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed connection info file {path}: {message}")]
    InfoFileFormat { path: PathBuf, message: String },

    #[error("wrong access mode for connection info file: \"{0}\"")]
    InfoFileMode(PathBuf),

    #[error("invalid port: '{0}'")]
    InvalidPort(String),
}

/// Failure to establish the connection.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("already connected")]
    AlreadyConnected,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot connect to {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot connect to {target} after {attempts} attempts")]
    RetriesExhausted { target: String, attempts: u32 },

    #[error("connection attempt to {0} interrupted")]
    Interrupted(String),
}

/// Top-level error type for the synchronization channel.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}(): write while not connected")]
    NotConnected(&'static str),
}
