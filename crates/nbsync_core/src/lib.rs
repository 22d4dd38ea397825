//! Core library for nbsync: the line protocol that lets an external tool
//! drive and observe an editor's buffers.

/// Atomic batches that defer redraws.
pub mod atomic;
/// Protocol buffer-id registry.
pub mod buffers;
/// Connection target and retry settings.
pub mod config;
/// Socket lifecycle and read/write paths.
pub mod connection;
pub mod constants;
/// Byte offset and line/column translation.
pub mod coords;
/// The narrow interface to the editor host.
pub mod editor;
/// Error types.
pub mod error;
/// Reassembly of complete lines from chunked input.
pub mod inbound;
pub mod keys;
/// In-memory editor host.
pub mod memory;
/// Per-connection protocol state, command dispatch and events.
pub mod session;
/// Marker types and guarded regions.
pub mod signs;
/// Line grammar, quoting and argument scanning.
pub mod wire;

#[cfg(test)]
mod test_support;

pub use config::{Config, ConnectTarget};
pub use connection::{Connection, Link, Status};
pub use editor::{BufferHandle, Editor, Position};
pub use error::{CommandError, ConfigError, ConnectError, FrameError, SyncError};
pub use memory::MemoryEditor;
pub use session::Session;
