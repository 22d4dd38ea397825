//! Root crate facade for the nbsync protocol library and headless host.

pub use nbsync_core::{
    atomic, buffers, config, connection, constants, coords, editor, error, inbound, keys,
    memory, session, signs, wire, BufferHandle, CommandError, Config, ConfigError,
    ConnectError, ConnectTarget, Connection, Editor, FrameError, Link, MemoryEditor,
    Position, Session, Status, SyncError,
};
pub use nbsync_host as host;
