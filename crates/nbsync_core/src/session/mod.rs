//! Protocol state of one connection.
//!
//! A [`Session`] owns everything the protocol remembers between lines: the
//! buffer registry, marker types, atomic batching, postponed keystrokes and
//! the queue of lines waiting to be written. It never touches the socket;
//! the connection manager feeds it complete lines and drains its outbox.

mod annotations;
mod dispatch;
mod edit;
mod handlers;
mod outbound;

pub use dispatch::Control;

use crate::atomic::AtomicBatch;
use crate::buffers::BufferRegistry;
use crate::editor::{BufferHandle, Editor};
use crate::signs::{self, SignRegistry};
use dispatch::Handler;
use std::collections::{HashMap, VecDeque};

/// A keystroke waiting for its buffer to receive a protocol id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingKey {
    pub buffer: BufferHandle,
    pub key: String,
}

/// Protocol state and outbound line queue for one connection.
pub struct Session {
    pub(crate) buffers: BufferRegistry,
    pub(crate) signs: SignRegistry,
    pub(crate) atomic: AtomicBatch,
    pub(crate) pending_keys: VecDeque<PendingKey>,
    outbox: VecDeque<String>,
    next_seq: u32,
    handlers: HashMap<&'static str, Handler>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            buffers: BufferRegistry::new(),
            signs: SignRegistry::new(),
            atomic: AtomicBatch::new(),
            pending_keys: VecDeque::new(),
            outbox: VecDeque::new(),
            next_seq: 1,
            handlers: handlers::table(),
        }
    }

    pub fn buffers(&self) -> &BufferRegistry {
        &self.buffers
    }

    pub fn signs(&self) -> &SignRegistry {
        &self.signs
    }

    pub fn pending_keys(&self) -> impl Iterator<Item = &PendingKey> {
        self.pending_keys.iter()
    }

    /// Queue one outbound line (without its newline).
    pub(crate) fn push_line(&mut self, line: String) {
        self.outbox.push_back(line);
    }

    /// Take all queued outbound lines, oldest first.
    pub fn drain_outbox(&mut self) -> Vec<String> {
        self.outbox.drain(..).collect()
    }

    pub fn has_output(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Next event sequence number.
    pub(crate) fn next_seq(&mut self) -> u32 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1).max(1);
        seq
    }

    /// Forget all state; used when the connection closes.
    pub fn reset(&mut self) {
        self.buffers.clear();
        self.signs = SignRegistry::new();
        self.atomic.reset();
        self.pending_keys.clear();
        self.outbox.clear();
        self.next_seq = 1;
    }

    /// Whether a local edit between `top` and `bot` would touch a guarded
    /// line of a tool-managed buffer.
    pub fn is_guarded(&self, editor: &dyn Editor, buf: BufferHandle, top: usize, bot: usize) -> bool {
        self.buffers.find_by_handle(buf).is_some() && signs::is_guarded(editor, buf, top, bot)
    }

    /// Cycle the markers shown on `line` after a gutter click.
    pub fn gutter_click(&self, editor: &mut dyn Editor, buf: BufferHandle, line: usize) -> bool {
        signs::gutter_click(editor, buf, line)
    }

    /// Request a redraw, deferred while an atomic batch is open.
    pub(crate) fn request_update(&mut self, editor: &mut dyn Editor) {
        if self.atomic.request_update() {
            editor.redraw();
        }
    }
}
