//! Byte-offset <-> line/column translation over a buffer's serialized text.
//!
//! The serialized text is the buffer's lines joined by its line terminator,
//! plus one trailing terminator when the buffer ends with one. Every verb that
//! carries an offset, `getLength` and every outbound offset use this rule.

use crate::editor::{BufferHandle, Editor, Position};

/// Read-only view of a buffer's line structure.
pub trait LineSource {
    fn line_count(&self) -> usize;
    /// Byte length of `line` (1-based) without its terminator.
    fn line_len(&self, line: usize) -> usize;
    fn eol_width(&self) -> usize;
    fn has_final_eol(&self) -> bool;
}

/// [`LineSource`] over one buffer of an [`Editor`].
pub struct EditorLines<'a> {
    editor: &'a dyn Editor,
    buf: BufferHandle,
}

impl<'a> EditorLines<'a> {
    pub fn new(editor: &'a dyn Editor, buf: BufferHandle) -> Self {
        Self { editor, buf }
    }
}

impl LineSource for EditorLines<'_> {
    fn line_count(&self) -> usize {
        self.editor.line_count(self.buf)
    }

    fn line_len(&self, line: usize) -> usize {
        self.editor.line(self.buf, line).map_or(0, |text| text.len())
    }

    fn eol_width(&self) -> usize {
        self.editor.eol_style(self.buf).width()
    }

    fn has_final_eol(&self) -> bool {
        self.editor.has_final_eol(self.buf)
    }
}

/// Terminator width following `line`, which is 0 only for a last line that
/// has no final end-of-line.
fn terminator_after(src: &dyn LineSource, line: usize, count: usize) -> usize {
    if line < count || src.has_final_eol() {
        src.eol_width()
    } else {
        0
    }
}

/// Serialized byte length of the buffer.
pub fn buffer_length(src: &dyn LineSource) -> usize {
    let count = src.line_count();
    (1..=count)
        .map(|line| src.line_len(line) + terminator_after(src, line, count))
        .sum()
}

/// Translate a byte offset into a position.
///
/// # Returns
/// `None` when `offset` lies beyond the end of the buffer. An empty buffer
/// only accepts offset 0, which maps to `(1, 0)`. The end-of-buffer offset
/// maps to `(line_count + 1, 0)` after a final end-of-line, otherwise to the
/// end of the last line.
pub fn offset_to_position(src: &dyn LineSource, offset: usize) -> Option<Position> {
    let count = src.line_count();
    if count == 0 {
        return (offset == 0).then(|| Position::new(1, 0));
    }

    let mut start = 0;
    for line in 1..=count {
        let len = src.line_len(line);
        let end = start + len + terminator_after(src, line, count);
        if offset < end {
            return Some(Position::new(line, offset - start));
        }
        if line == count && offset == end {
            return Some(if src.has_final_eol() {
                Position::new(count + 1, 0)
            } else {
                Position::new(count, len)
            });
        }
        start = end;
    }
    None
}

/// Translate a position into a byte offset.
///
/// # Returns
/// `None` for line 0 or lines past the end (the virtual line after a final
/// end-of-line is accepted at column 0).
pub fn position_to_offset(src: &dyn LineSource, pos: Position) -> Option<usize> {
    let count = src.line_count();
    if pos.line == 0 {
        return None;
    }
    if count == 0 {
        return (pos.line == 1).then_some(pos.col);
    }
    if pos.line > count {
        return (pos.line == count + 1 && pos.col == 0 && src.has_final_eol())
            .then(|| buffer_length(src));
    }

    let eol = src.eol_width();
    let before: usize = (1..pos.line).map(|line| src.line_len(line) + eol).sum();
    Some(before + pos.col)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lines {
        lines: Vec<&'static str>,
        eol: usize,
        final_eol: bool,
    }

    impl LineSource for Lines {
        fn line_count(&self) -> usize {
            self.lines.len()
        }
        fn line_len(&self, line: usize) -> usize {
            self.lines.get(line - 1).map_or(0, |l| l.len())
        }
        fn eol_width(&self) -> usize {
            self.eol
        }
        fn has_final_eol(&self) -> bool {
            self.final_eol
        }
    }

    fn lines(lines: Vec<&'static str>, eol: usize, final_eol: bool) -> Lines {
        Lines {
            lines,
            eol,
            final_eol,
        }
    }

    #[test]
    fn length_counts_terminators_per_convention() {
        assert_eq!(buffer_length(&lines(vec!["ab", "cd"], 1, false)), 5);
        assert_eq!(buffer_length(&lines(vec!["ab", "cd"], 1, true)), 6);
        assert_eq!(buffer_length(&lines(vec!["ab", "cd"], 2, true)), 8);
        assert_eq!(buffer_length(&lines(vec![], 1, false)), 0);
    }

    #[test]
    fn offsets_map_to_line_and_column() {
        let src = lines(vec!["ab", "cd"], 1, false);
        assert_eq!(offset_to_position(&src, 0), Some(Position::new(1, 0)));
        assert_eq!(offset_to_position(&src, 2), Some(Position::new(1, 2)));
        assert_eq!(offset_to_position(&src, 3), Some(Position::new(2, 0)));
        assert_eq!(offset_to_position(&src, 5), Some(Position::new(2, 2)));
        assert_eq!(offset_to_position(&src, 6), None);

        let src = lines(vec!["ab", "cd"], 1, true);
        assert_eq!(offset_to_position(&src, 6), Some(Position::new(3, 0)));
        assert_eq!(offset_to_position(&src, 7), None);
    }

    #[test]
    fn empty_buffer_accepts_only_offset_zero() {
        let src = lines(vec![], 1, false);
        assert_eq!(offset_to_position(&src, 0), Some(Position::new(1, 0)));
        assert_eq!(offset_to_position(&src, 1), None);
        assert_eq!(position_to_offset(&src, Position::new(1, 0)), Some(0));
    }

    #[test]
    fn round_trip_holds_for_every_offset() {
        let cases = [
            lines(vec!["hello", "", "world!"], 1, true),
            lines(vec!["hello", "", "world!"], 1, false),
            lines(vec!["x", "yz", ""], 2, true),
            lines(vec!["solo"], 2, false),
        ];
        for src in &cases {
            let length = buffer_length(src);
            for offset in 0..=length {
                let pos = offset_to_position(src, offset).expect("in range");
                assert_eq!(position_to_offset(src, pos), Some(offset), "offset {}", offset);
            }
            assert_eq!(offset_to_position(src, length + 1), None);
        }
    }

    #[test]
    fn round_trip_holds_for_every_valid_position() {
        let src = lines(vec!["abc", "", "de"], 1, true);
        for line in 1..=3 {
            for col in 0..=src.line_len(line) {
                let pos = Position::new(line, col);
                let offset = position_to_offset(&src, pos).expect("valid");
                assert_eq!(offset_to_position(&src, offset), Some(pos));
            }
        }
        assert_eq!(position_to_offset(&src, Position::new(0, 0)), None);
        assert_eq!(position_to_offset(&src, Position::new(5, 0)), None);
    }
}
