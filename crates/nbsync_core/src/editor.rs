//! The narrow interface the core uses to reach the editor host.
//!
//! Everything the protocol needs from the host goes through [`Editor`]: line
//! access and mutation, buffer lifecycle, flags, gutter markers and a handful
//! of UI hooks. Methods with default bodies are optional host features.

use std::fmt;

/// Opaque identity of a host buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A line/column location. Lines are 1-based, columns are 0-based byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Line terminator style of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EolStyle {
    #[default]
    Unix,
    Dos,
}

impl EolStyle {
    /// Number of bytes one terminator occupies in the serialized text.
    pub fn width(self) -> usize {
        match self {
            Self::Unix => 1,
            Self::Dos => 2,
        }
    }
}

/// Gutter glyph of a marker type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignGlyph {
    #[default]
    None,
    /// One or two display characters.
    Text(String),
    /// Path to an image file.
    Icon(String),
}

/// Line highlight of a marker type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignHighlight {
    pub group: String,
    pub fg: Option<String>,
    pub bg: Option<String>,
}

/// Presentation handed to the host when a marker type is defined.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignStyle {
    pub name: String,
    pub tooltip: String,
    pub glyph: SignGlyph,
    pub highlight: Option<SignHighlight>,
}

/// A marker currently placed in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedSign {
    pub id: u32,
    pub line: usize,
    pub type_id: u32,
}

/// Host operations used by the synchronization core.
///
/// Line numbers are 1-based. Calls naming a handle the host no longer knows
/// should be treated as no-ops (or empty results) rather than panics.
pub trait Editor {
    fn line_count(&self, buf: BufferHandle) -> usize;
    /// Text of `line` without its terminator; `None` when out of range.
    fn line(&self, buf: BufferHandle, line: usize) -> Option<String>;
    fn replace_line(&mut self, buf: BufferHandle, line: usize, text: &str);
    /// Insert a new line after `after` (0 inserts at the top).
    fn insert_line(&mut self, buf: BufferHandle, after: usize, text: &str);
    /// Delete lines `first..=last`.
    fn delete_lines(&mut self, buf: BufferHandle, first: usize, last: usize);

    fn eol_style(&self, buf: BufferHandle) -> EolStyle;
    fn set_eol_style(&mut self, buf: BufferHandle, style: EolStyle);
    fn has_final_eol(&self, buf: BufferHandle) -> bool;
    fn set_final_eol(&mut self, buf: BufferHandle, value: bool);
    fn clear_undo(&mut self, _buf: BufferHandle) {}

    /// Find a buffer by name or create a new (empty) one without reading disk.
    fn create_buffer(&mut self, name: Option<&str>) -> BufferHandle;
    /// Open `path` for editing, reading it from disk when it exists.
    fn edit_file(&mut self, path: &str) -> BufferHandle;
    fn find_buffer(&self, path: &str) -> Option<BufferHandle>;
    fn buffer_name(&self, buf: BufferHandle) -> Option<String>;
    fn wipe_buffer(&mut self, buf: BufferHandle);
    fn current_buffer(&self) -> Option<BufferHandle>;
    fn show_buffer(&mut self, buf: BufferHandle);

    fn is_modified(&self, buf: BufferHandle) -> bool;
    fn set_modified(&mut self, buf: BufferHandle, value: bool);
    fn is_read_only(&self, buf: BufferHandle) -> bool;
    fn set_read_only(&mut self, buf: BufferHandle, value: bool);
    fn set_mtime(&mut self, _buf: BufferHandle, _mtime: i64) {}
    /// Write the buffer to its file.
    fn write_buffer(&mut self, buf: BufferHandle) -> Result<(), String>;
    /// Number of modified buffers, used by `saveAndExit`.
    fn modified_count(&self) -> usize;
    fn quit_all(&mut self) {}
    fn raise(&mut self) {}

    fn cursor(&self, buf: BufferHandle) -> Option<Position>;
    fn set_cursor(&mut self, buf: BufferHandle, pos: Position);

    fn define_sign(&mut self, type_id: u32, style: &SignStyle);
    fn place_sign(&mut self, buf: BufferHandle, id: u32, type_id: u32, line: usize);
    /// Remove the marker `id`; returns whether one was removed.
    fn unplace_sign(&mut self, buf: BufferHandle, id: u32) -> bool;
    fn unplace_all_signs(&mut self);
    fn placed_signs(&self, buf: BufferHandle) -> Vec<PlacedSign>;
    /// Reorder markers on one line; `ids` lists them in display order.
    fn reorder_signs(&mut self, _buf: BufferHandle, _line: usize, _ids: &[u32]) {}
    fn jump_to_sign(&mut self, _buf: BufferHandle, _id: u32) {}

    /// Make `key` (e.g. `C-S-F2`) deliver a keystroke event when pressed.
    fn map_special_key(&mut self, key: &str);
    fn show_balloon(&mut self, text: &str);
    fn redraw(&mut self);
    fn report_error(&mut self, message: &str);
    fn show_message(&mut self, _message: &str) {}
    /// Start or stop watching the connection for input.
    fn input_watch(&mut self, _enabled: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eol_width_matches_terminator_bytes() {
        assert_eq!(EolStyle::Unix.width(), "\n".len());
        assert_eq!(EolStyle::Dos.width(), "\r\n".len());
    }

    #[test]
    fn positions_order_by_line_then_column() {
        assert!(Position::new(1, 9) < Position::new(2, 0));
        assert!(Position::new(3, 1) > Position::new(3, 0));
    }
}
