//! Events sent to the tool.
//!
//! Every event is one line `<bufno>:<verb>=<seq> <args>` queued on the
//! session outbox; the connection writes the outbox after each call. Events
//! that name a buffer are only sent for buffers the tool knows about.

use super::{PendingKey, Session};
use crate::constants::PROTOCOL_VERSION;
use crate::coords::{position_to_offset, EditorLines};
use crate::editor::{BufferHandle, Editor, Position};
use crate::keys::{key_name, Key, Modifiers};
use crate::wire::quote;
use tracing::{debug, info};

impl Session {
    /// Queue the opening lines of a connection.
    pub fn handshake(&mut self, token: &str) {
        self.push_line(format!("AUTH {}", token));
        self.push_line(format!("0:version=0 \"{}\"", PROTOCOL_VERSION));
        self.push_line("0:startupDone=0".to_string());
    }

    /// Queue the goodbye line sent before the socket closes.
    pub fn disconnect_line(&mut self) {
        let seq = self.next_seq();
        self.push_line(format!("0:disconnect={}", seq));
    }

    /// Protocol id of a host buffer the tool is listening to.
    fn listening(&self, buf: BufferHandle) -> Option<u32> {
        self.buffers
            .find_by_handle(buf)
            .filter(|bufno| self.buffers.get(*bufno).is_some_and(|e| e.fire_changes))
    }

    fn offset_of(editor: &dyn Editor, buf: BufferHandle, pos: Position) -> usize {
        position_to_offset(&EditorLines::new(editor, buf), pos).unwrap_or(0)
    }

    /// Tell the tool a file was opened in the host.
    ///
    /// Buffers without a name are not announced.
    pub fn file_opened(&mut self, editor: &dyn Editor, buf: BufferHandle) {
        let Some(path) = editor.buffer_name(buf) else {
            return;
        };
        let bufno = self.buffers.find_by_handle(buf).unwrap_or(0);
        self.push_line(format!("{}:fileOpened=0 \"{}\" T F", bufno, quote(&path)));
    }

    /// Tell the tool a buffer it knows about became the current one.
    pub fn file_activated(&mut self, editor: &dyn Editor, buf: BufferHandle) {
        let Some(bufno) = self.buffers.find_by_handle(buf) else {
            return;
        };
        let Some(path) = editor.buffer_name(buf) else {
            return;
        };
        self.push_line(format!("{}:fileOpened=0 \"{}\" T F", bufno, quote(&path)));
    }

    /// Report that a buffer was wiped in the host and unbind it.
    pub fn file_killed(&mut self, buf: BufferHandle) {
        let Some(bufno) = self.buffers.find_by_handle(buf) else {
            return;
        };
        let seq = self.next_seq();
        self.push_line(format!("{}:killed={}", bufno, seq));
        if let Some(entry) = self.buffers.get_mut(bufno) {
            entry.handle = None;
        }
        debug!(bufno, %buf, "buffer killed");
    }

    /// Report text typed into a buffer at `pos`.
    pub fn text_inserted(
        &mut self,
        editor: &dyn Editor,
        buf: BufferHandle,
        pos: Position,
        text: &str,
    ) {
        let Some(bufno) = self.listening(buf) else {
            return;
        };
        let offset = Self::offset_of(editor, buf, pos);
        let seq = self.next_seq();
        self.push_line(format!("{}:insert={} {} \"{}\"", bufno, seq, offset, quote(text)));
        if let Some(entry) = self.buffers.get_mut(bufno) {
            if entry.insert_done {
                entry.modified = true;
            }
        }
    }

    /// Report `len` bytes deleted from a buffer at `pos`.
    pub fn text_removed(&mut self, editor: &dyn Editor, buf: BufferHandle, pos: Position, len: usize) {
        let Some(bufno) = self.listening(buf) else {
            return;
        };
        let offset = Self::offset_of(editor, buf, pos);
        let seq = self.next_seq();
        self.push_line(format!("{}:remove={} {} {}", bufno, seq, offset, len));
        if let Some(entry) = self.buffers.get_mut(bufno) {
            entry.modified = true;
        }
    }

    /// Note that every line of a buffer was deleted.
    ///
    /// Marks the entry modified once the initial load is done. The matching
    /// `remove` event with offset 0 and length -1 is traced but not sent.
    pub fn all_lines_deleted(&mut self, buf: BufferHandle) {
        let Some(bufno) = self.listening(buf) else {
            return;
        };
        if let Some(entry) = self.buffers.get_mut(bufno) {
            if entry.insert_done {
                entry.modified = true;
            }
        }
        debug!(bufno, "suppressed remove event for all lines");
    }

    /// Report that the host wrote a buffer to disk.
    pub fn buffer_saved(&mut self, buf: BufferHandle) {
        let Some(bufno) = self.listening(buf) else {
            return;
        };
        let seq = self.next_seq();
        self.push_line(format!("{}:save={}", bufno, seq));
        if let Some(entry) = self.buffers.get_mut(bufno) {
            entry.modified = false;
        }
    }

    /// Report that the host dropped a buffer's changes.
    pub fn buffer_unmodified(&mut self, buf: BufferHandle) {
        let Some(bufno) = self.buffers.find_by_handle(buf) else {
            return;
        };
        let seq = self.next_seq();
        self.push_line(format!("{}:unmodified={}", bufno, seq));
    }

    fn new_dot_and_mark(&mut self, bufno: u32, offset: usize) {
        let seq = self.next_seq();
        self.push_line(format!("{}:newDotAndMark={} {} {}", bufno, seq, offset, offset));
    }

    /// Report a mouse button release at the cursor of a registered buffer.
    pub fn button_released(&mut self, editor: &dyn Editor, buf: BufferHandle, button: u32) {
        let Some(bufno) = self.buffers.find_by_handle(buf) else {
            return;
        };
        let pos = editor.cursor(buf).unwrap_or(Position::new(1, 0));
        self.new_dot_and_mark(bufno, Self::offset_of(editor, buf, pos));
        let seq = self.next_seq();
        self.push_line(format!(
            "{}:buttonRelease={} {} {} {}",
            bufno, seq, button, pos.line, pos.col
        ));
    }

    /// Send a keystroke, or hold it until the buffer gets a protocol id.
    ///
    /// # Returns
    /// `true` when the key was sent, `false` when it was queued. A queued key
    /// also announces the buffer with `fileOpened` so the tool can number it.
    pub fn keystroke(&mut self, editor: &dyn Editor, buf: BufferHandle, key: &str) -> bool {
        if self.send_key(editor, buf, key) {
            return true;
        }
        if let Some(path) = editor.buffer_name(buf) {
            self.push_line(format!("0:fileOpened=0 \"{}\" T F", quote(&path)));
        }
        self.pending_keys.push_back(PendingKey {
            buffer: buf,
            key: key.to_string(),
        });
        debug!(%buf, key, "keystroke postponed");
        false
    }

    /// [`Session::keystroke`] for a key and modifier state.
    pub fn key_pressed(
        &mut self,
        editor: &dyn Editor,
        buf: BufferHandle,
        key: Key,
        mods: Modifiers,
    ) -> bool {
        let name = key_name(key, mods);
        self.keystroke(editor, buf, &name)
    }

    fn send_key(&mut self, editor: &dyn Editor, buf: BufferHandle, key: &str) -> bool {
        let Some(bufno) = self.buffers.find_by_handle(buf) else {
            return false;
        };
        let pos = editor.cursor(buf).unwrap_or(Position::new(1, 0));
        let offset = Self::offset_of(editor, buf, pos);
        self.new_dot_and_mark(bufno, offset);
        let seq = self.next_seq();
        self.push_line(format!("{}:keyCommand={} \"{}\"", bufno, seq, quote(key)));
        let seq = self.next_seq();
        self.push_line(format!(
            "{}:keyAtPos={} \"{}\" {} {}/{}",
            bufno,
            seq,
            quote(key),
            offset,
            pos.line,
            pos.col
        ));
        true
    }

    /// Send postponed keystrokes in arrival order.
    ///
    /// Stops at the first key whose buffer still has no protocol id; that key
    /// stays at the front of the queue.
    pub(crate) fn replay_pending_keys(&mut self, editor: &dyn Editor) {
        while let Some(pending) = self.pending_keys.pop_front() {
            if !self.send_key(editor, pending.buffer, &pending.key) {
                self.pending_keys.push_front(pending);
                break;
            }
        }
    }

    /// Answer a balloon-evaluation request with the text under the pointer.
    pub fn balloon_text(&mut self, text: &str) {
        let seq = self.next_seq();
        self.push_line(format!("0:balloonText={} \"{}\"", seq, quote(text)));
    }

    /// Report the host window's size and position.
    pub fn geometry(&mut self, cols: u32, rows: u32, x: i32, y: i32) {
        let seq = self.next_seq();
        self.push_line(format!("0:geometry={} {} {} {} {}", seq, cols, rows, x, y));
    }

    /// Report every registered buffer as killed before the host exits.
    ///
    /// A forced quit first tells the tool the changes were dropped.
    pub fn farewell(&mut self, forced_quit: bool) {
        let bound: Vec<BufferHandle> = self.buffers.bound().map(|(_, buf)| buf).collect();
        info!(buffers = bound.len(), forced_quit, "host exiting");
        for buf in bound {
            if forced_quit {
                self.buffer_unmodified(buf);
            }
            self.file_killed(buf);
        }
    }
}
