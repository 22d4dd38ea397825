//! In-memory [`Editor`] host.
//!
//! Buffers are plain line vectors. The host binary mirrors the tool's buffers
//! here, and tests use it to observe what the protocol did.

use crate::editor::{BufferHandle, Editor, EolStyle, PlacedSign, Position, SignStyle};
use std::collections::BTreeMap;
use std::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
struct MemoryBuffer {
    name: Option<String>,
    lines: Vec<String>,
    eol: EolStyle,
    final_eol: bool,
    modified: bool,
    read_only: bool,
    mtime: Option<i64>,
    cursor: Position,
    signs: Vec<PlacedSign>,
}

impl MemoryBuffer {
    fn serialize(&self) -> String {
        let eol = match self.eol {
            EolStyle::Unix => "\n",
            EolStyle::Dos => "\r\n",
        };
        let mut text = self.lines.join(eol);
        if self.final_eol && !self.lines.is_empty() {
            text.push_str(eol);
        }
        text
    }

    fn load(&mut self, text: &str) {
        self.eol = if text.contains("\r\n") {
            EolStyle::Dos
        } else {
            EolStyle::Unix
        };
        self.final_eol = text.ends_with('\n');
        let body = text.strip_suffix('\n').unwrap_or(text);
        let body = body.strip_suffix('\r').unwrap_or(body);
        self.lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                .collect()
        };
    }
}

/// Reference host keeping every buffer in memory.
#[derive(Debug, Default)]
pub struct MemoryEditor {
    buffers: BTreeMap<u32, MemoryBuffer>,
    next_handle: u32,
    current: Option<BufferHandle>,
    sign_types: BTreeMap<u32, SignStyle>,
    mapped_keys: Vec<String>,
    balloons: Vec<String>,
    errors: Vec<String>,
    messages: Vec<String>,
    redraws: usize,
    watching: bool,
    quit_requested: bool,
    raised: usize,
}

impl MemoryEditor {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            ..Self::default()
        }
    }

    fn buffer(&self, buf: BufferHandle) -> Option<&MemoryBuffer> {
        self.buffers.get(&buf.0)
    }

    fn buffer_mut(&mut self, buf: BufferHandle) -> Option<&mut MemoryBuffer> {
        self.buffers.get_mut(&buf.0)
    }

    fn new_buffer(&mut self, name: Option<&str>) -> BufferHandle {
        let handle = BufferHandle(self.next_handle.max(1));
        self.next_handle = handle.0 + 1;
        self.buffers.insert(
            handle.0,
            MemoryBuffer {
                name: name.map(str::to_string),
                cursor: Position::new(1, 0),
                ..MemoryBuffer::default()
            },
        );
        handle
    }

    /// Replace a buffer's contents; a trailing `\n` sets the final end-of-line.
    pub fn set_text(&mut self, buf: BufferHandle, text: &str) {
        if let Some(buffer) = self.buffer_mut(buf) {
            buffer.load(text);
        }
    }

    /// Serialized contents of a buffer.
    pub fn text(&self, buf: BufferHandle) -> Option<String> {
        self.buffer(buf).map(MemoryBuffer::serialize)
    }

    pub fn lines(&self, buf: BufferHandle) -> Vec<String> {
        self.buffer(buf).map(|b| b.lines.clone()).unwrap_or_default()
    }

    pub fn make_current(&mut self, buf: BufferHandle) {
        if self.buffers.contains_key(&buf.0) {
            self.current = Some(buf);
        }
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn mtime(&self, buf: BufferHandle) -> Option<i64> {
        self.buffer(buf).and_then(|b| b.mtime)
    }

    pub fn sign_types(&self) -> &BTreeMap<u32, SignStyle> {
        &self.sign_types
    }

    pub fn mapped_keys(&self) -> &[String] {
        &self.mapped_keys
    }

    pub fn balloons(&self) -> &[String] {
        &self.balloons
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn redraw_count(&self) -> usize {
        self.redraws
    }

    pub fn is_watching_input(&self) -> bool {
        self.watching
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn raise_count(&self) -> usize {
        self.raised
    }
}

impl Editor for MemoryEditor {
    fn line_count(&self, buf: BufferHandle) -> usize {
        self.buffer(buf).map_or(0, |b| b.lines.len())
    }

    fn line(&self, buf: BufferHandle, line: usize) -> Option<String> {
        let index = line.checked_sub(1)?;
        self.buffer(buf)?.lines.get(index).cloned()
    }

    fn replace_line(&mut self, buf: BufferHandle, line: usize, text: &str) {
        if let Some(buffer) = self.buffer_mut(buf) {
            if let Some(slot) = line.checked_sub(1).and_then(|i| buffer.lines.get_mut(i)) {
                *slot = text.to_string();
                buffer.modified = true;
            }
        }
    }

    fn insert_line(&mut self, buf: BufferHandle, after: usize, text: &str) {
        if let Some(buffer) = self.buffer_mut(buf) {
            let at = after.min(buffer.lines.len());
            buffer.lines.insert(at, text.to_string());
            for sign in buffer.signs.iter_mut().filter(|s| s.line > at) {
                sign.line += 1;
            }
            buffer.modified = true;
        }
    }

    fn delete_lines(&mut self, buf: BufferHandle, first: usize, last: usize) {
        if let Some(buffer) = self.buffer_mut(buf) {
            let len = buffer.lines.len();
            if first == 0 || first > last || first > len {
                return;
            }
            let last = last.min(len);
            buffer.lines.drain(first - 1..last);
            let removed = last - first + 1;
            buffer
                .signs
                .retain(|s| !(first..=last).contains(&s.line));
            for sign in buffer.signs.iter_mut().filter(|s| s.line > last) {
                sign.line -= removed;
            }
            buffer.modified = true;
        }
    }

    fn eol_style(&self, buf: BufferHandle) -> EolStyle {
        self.buffer(buf).map(|b| b.eol).unwrap_or_default()
    }

    fn set_eol_style(&mut self, buf: BufferHandle, style: EolStyle) {
        if let Some(buffer) = self.buffer_mut(buf) {
            buffer.eol = style;
        }
    }

    fn has_final_eol(&self, buf: BufferHandle) -> bool {
        self.buffer(buf).is_some_and(|b| b.final_eol)
    }

    fn set_final_eol(&mut self, buf: BufferHandle, value: bool) {
        if let Some(buffer) = self.buffer_mut(buf) {
            buffer.final_eol = value;
        }
    }

    fn create_buffer(&mut self, name: Option<&str>) -> BufferHandle {
        if let Some(existing) = name.and_then(|n| self.find_buffer(n)) {
            return existing;
        }
        self.new_buffer(name)
    }

    fn edit_file(&mut self, path: &str) -> BufferHandle {
        let handle = self.create_buffer(Some(path));
        match fs::read_to_string(path) {
            Ok(text) => {
                if let Some(buffer) = self.buffer_mut(handle) {
                    buffer.load(&text);
                    buffer.modified = false;
                }
            }
            Err(err) => debug!(path, error = %err, "editing new file"),
        }
        self.current = Some(handle);
        handle
    }

    fn find_buffer(&self, path: &str) -> Option<BufferHandle> {
        self.buffers
            .iter()
            .find(|(_, b)| b.name.as_deref() == Some(path))
            .map(|(id, _)| BufferHandle(*id))
    }

    fn buffer_name(&self, buf: BufferHandle) -> Option<String> {
        self.buffer(buf)?.name.clone()
    }

    fn wipe_buffer(&mut self, buf: BufferHandle) {
        self.buffers.remove(&buf.0);
        if self.current == Some(buf) {
            self.current = None;
        }
    }

    fn current_buffer(&self) -> Option<BufferHandle> {
        self.current
    }

    fn show_buffer(&mut self, buf: BufferHandle) {
        self.make_current(buf);
    }

    fn is_modified(&self, buf: BufferHandle) -> bool {
        self.buffer(buf).is_some_and(|b| b.modified)
    }

    fn set_modified(&mut self, buf: BufferHandle, value: bool) {
        if let Some(buffer) = self.buffer_mut(buf) {
            buffer.modified = value;
        }
    }

    fn is_read_only(&self, buf: BufferHandle) -> bool {
        self.buffer(buf).is_some_and(|b| b.read_only)
    }

    fn set_read_only(&mut self, buf: BufferHandle, value: bool) {
        if let Some(buffer) = self.buffer_mut(buf) {
            buffer.read_only = value;
        }
    }

    fn set_mtime(&mut self, buf: BufferHandle, mtime: i64) {
        if let Some(buffer) = self.buffer_mut(buf) {
            buffer.mtime = Some(mtime);
        }
    }

    fn write_buffer(&mut self, buf: BufferHandle) -> Result<(), String> {
        let buffer = self
            .buffer_mut(buf)
            .ok_or_else(|| format!("no buffer {}", buf))?;
        let name = buffer
            .name
            .clone()
            .ok_or_else(|| format!("buffer {} has no name", buf))?;
        fs::write(&name, buffer.serialize()).map_err(|err| {
            warn!(path = %name, error = %err, "write failed");
            err.to_string()
        })?;
        buffer.modified = false;
        Ok(())
    }

    fn modified_count(&self) -> usize {
        self.buffers.values().filter(|b| b.modified).count()
    }

    fn quit_all(&mut self) {
        self.quit_requested = true;
    }

    fn raise(&mut self) {
        self.raised += 1;
    }

    fn cursor(&self, buf: BufferHandle) -> Option<Position> {
        self.buffer(buf).map(|b| b.cursor)
    }

    fn set_cursor(&mut self, buf: BufferHandle, pos: Position) {
        if let Some(buffer) = self.buffer_mut(buf) {
            let line = pos.line.clamp(1, buffer.lines.len().max(1));
            let len = buffer.lines.get(line - 1).map_or(0, String::len);
            buffer.cursor = Position::new(line, pos.col.min(len));
        }
    }

    fn define_sign(&mut self, type_id: u32, style: &SignStyle) {
        self.sign_types.insert(type_id, style.clone());
    }

    fn place_sign(&mut self, buf: BufferHandle, id: u32, type_id: u32, line: usize) {
        if let Some(buffer) = self.buffer_mut(buf) {
            match buffer.signs.iter_mut().find(|s| s.id == id) {
                Some(sign) => {
                    sign.line = line;
                    sign.type_id = type_id;
                }
                None => buffer.signs.push(PlacedSign { id, line, type_id }),
            }
        }
    }

    fn unplace_sign(&mut self, buf: BufferHandle, id: u32) -> bool {
        let Some(buffer) = self.buffer_mut(buf) else {
            return false;
        };
        let before = buffer.signs.len();
        buffer.signs.retain(|s| s.id != id);
        buffer.signs.len() != before
    }

    fn unplace_all_signs(&mut self) {
        for buffer in self.buffers.values_mut() {
            buffer.signs.clear();
        }
    }

    fn placed_signs(&self, buf: BufferHandle) -> Vec<PlacedSign> {
        let mut signs = self.buffer(buf).map(|b| b.signs.clone()).unwrap_or_default();
        signs.sort_by_key(|s| s.line);
        signs
    }

    fn reorder_signs(&mut self, buf: BufferHandle, line: usize, ids: &[u32]) {
        if let Some(buffer) = self.buffer_mut(buf) {
            let (mut on_line, rest): (Vec<_>, Vec<_>) =
                buffer.signs.drain(..).partition(|s| s.line == line);
            on_line.sort_by_key(|s| ids.iter().position(|id| *id == s.id));
            buffer.signs = rest;
            buffer.signs.extend(on_line);
        }
    }

    fn jump_to_sign(&mut self, buf: BufferHandle, id: u32) {
        let target = self
            .buffer(buf)
            .and_then(|b| b.signs.iter().find(|s| s.id == id))
            .map(|s| s.line);
        if let Some(line) = target {
            self.current = Some(buf);
            self.set_cursor(buf, Position::new(line, 0));
        }
    }

    fn map_special_key(&mut self, key: &str) {
        self.mapped_keys.push(key.to_string());
    }

    fn show_balloon(&mut self, text: &str) {
        self.balloons.push(text.to_string());
    }

    fn redraw(&mut self) {
        self.redraws += 1;
    }

    fn report_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn show_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn input_watch(&mut self, enabled: bool) {
        self.watching = enabled;
    }
}
