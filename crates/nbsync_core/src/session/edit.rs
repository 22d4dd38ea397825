//! Text handlers: `insert`, `remove`, `getLength`, `getText`.
//!
//! Both mutations work on the serialized-text view from [`crate::coords`]
//! and leave the buffer's modified flag as it was.

use super::dispatch::{Reply, Request};
use super::Session;
use crate::coords::{buffer_length, offset_to_position, EditorLines};
use crate::editor::{BufferHandle, Editor, EolStyle, Position};
use crate::error::CommandError;
use crate::wire::quote;
use tracing::debug;

pub(super) fn get_length(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (_, buf) = req.loaded()?;
    let length = buffer_length(&EditorLines::new(editor, buf));
    Ok(Reply::Number(length as i64))
}

pub(super) fn get_text(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (_, buf) = req.loaded()?;
    let mut text = String::from("\"");
    for line in 1..=editor.line_count(buf) {
        if let Some(content) = editor.line(buf, line) {
            text.push_str(&quote(&content));
        }
        text.push_str("\\n");
    }
    text.push('"');
    Ok(Reply::Text(text))
}

pub(super) fn insert(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    let offset = req.args.number().ok_or_else(|| req.bad_argument())?;
    let text = req.args.quoted().ok_or_else(|| req.bad_argument())?;
    debug!(bufno, offset, bytes = text.len(), "insert");

    let was_modified = editor.is_modified(buf);
    splice(editor, buf, offset, &text);
    editor.set_modified(buf, was_modified);
    editor.clear_undo(buf);
    req.update = true;
    Ok(Reply::Nil)
}

pub(super) fn remove(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    let offset = req.args.number().ok_or(CommandError::BadPosition)?;
    let count = req.args.number().unwrap_or(0);

    let (first, length) = {
        let lines = EditorLines::new(editor, buf);
        let first = usize::try_from(offset)
            .ok()
            .and_then(|off| offset_to_position(&lines, off))
            .ok_or(CommandError::BadPosition)?;
        (first, buffer_length(&lines))
    };
    if count <= 0 {
        return Ok(Reply::Nil);
    }
    let end_offset = offset
        .checked_add(count)
        .and_then(|end| usize::try_from(end).ok())
        .ok_or(CommandError::BadCount)?;
    if end_offset > length {
        return Err(CommandError::BadCount);
    }
    let end = offset_to_position(&EditorLines::new(editor, buf), end_offset)
        .ok_or(CommandError::BadCount)?;
    debug!(bufno, offset, count, "remove");

    let was_modified = editor.is_modified(buf);
    delete_range(editor, buf, first, end);
    editor.set_cursor(buf, first);
    editor.set_modified(buf, was_modified);
    editor.clear_undo(buf);
    req.update = true;
    Ok(Reply::Nil)
}

/// Largest char boundary of `text` at or below `col`.
fn char_floor(text: &str, col: usize) -> usize {
    let mut col = col.min(text.len());
    while !text.is_char_boundary(col) {
        col -= 1;
    }
    col
}

/// Position where an untranslatable insert offset lands: the end of text.
fn end_of_buffer(editor: &dyn Editor, buf: BufferHandle) -> Position {
    let count = editor.line_count(buf);
    if editor.has_final_eol(buf) {
        Position::new(count + 1, 0)
    } else {
        let len = editor.line(buf, count).map_or(0, |l| l.len());
        Position::new(count, len)
    }
}

fn splice(editor: &mut dyn Editor, buf: BufferHandle, offset: i64, text: &str) {
    if text.is_empty() {
        return;
    }
    let pieces: Vec<&str> = text.split('\n').collect();
    let last_piece = pieces.len() - 1;
    let segments: Vec<&str> = pieces
        .iter()
        .enumerate()
        .map(|(i, &seg)| {
            if i < last_piece {
                seg.strip_suffix('\r').unwrap_or(seg)
            } else {
                seg
            }
        })
        .collect();

    let count = editor.line_count(buf);
    if count == 0 {
        let style = if text.contains("\r\n") {
            EolStyle::Dos
        } else {
            EolStyle::Unix
        };
        editor.set_eol_style(buf, style);
        let ends_with_eol = text.ends_with('\n');
        let body = if ends_with_eol {
            &segments[..segments.len() - 1]
        } else {
            &segments[..]
        };
        for (i, seg) in body.iter().enumerate() {
            editor.insert_line(buf, i, seg);
        }
        editor.set_final_eol(buf, ends_with_eol);
        return;
    }

    let pos = usize::try_from(offset)
        .ok()
        .and_then(|off| offset_to_position(&EditorLines::new(editor, buf), off))
        .unwrap_or_else(|| end_of_buffer(editor, buf));

    let virtual_line = pos.line > count;
    let current = if virtual_line {
        String::new()
    } else {
        editor.line(buf, pos.line).unwrap_or_default()
    };
    let col = char_floor(&current, pos.col);
    let (prefix, suffix) = current.split_at(col);

    let mut new_lines: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
    if let Some(first) = new_lines.first_mut() {
        first.insert_str(0, prefix);
    }
    if let Some(last) = new_lines.last_mut() {
        last.push_str(suffix);
    }

    if virtual_line {
        // Appending after the final end-of-line.
        let ends_with_eol = new_lines.len() > 1 && new_lines.last().is_some_and(String::is_empty);
        if ends_with_eol {
            new_lines.pop();
        }
        for (i, line) in new_lines.iter().enumerate() {
            editor.insert_line(buf, count + i, line);
        }
        editor.set_final_eol(buf, ends_with_eol);
        return;
    }

    let mut lines = new_lines.into_iter();
    if let Some(first) = lines.next() {
        editor.replace_line(buf, pos.line, &first);
    }
    for (i, line) in lines.enumerate() {
        editor.insert_line(buf, pos.line + i, &line);
    }
    normalize_trailing_line(editor, buf);
}

/// Fold a trailing empty line of a buffer without a final end-of-line into
/// the final end-of-line flag; both serialize the same way.
fn normalize_trailing_line(editor: &mut dyn Editor, buf: BufferHandle) {
    let count = editor.line_count(buf);
    if count > 1
        && !editor.has_final_eol(buf)
        && editor.line(buf, count).is_some_and(|l| l.is_empty())
    {
        editor.delete_lines(buf, count, count);
        editor.set_final_eol(buf, true);
    }
}

fn unplace_on_lines(editor: &mut dyn Editor, buf: BufferHandle, first: usize, last: usize) {
    let doomed: Vec<u32> = editor
        .placed_signs(buf)
        .into_iter()
        .filter(|sign| sign.line >= first && sign.line <= last)
        .map(|sign| sign.id)
        .collect();
    for id in doomed {
        editor.unplace_sign(buf, id);
    }
}

/// Delete the text between `first` (inclusive) and `end` (exclusive).
fn delete_range(editor: &mut dyn Editor, buf: BufferHandle, first: Position, end: Position) {
    let count = editor.line_count(buf);

    if first.col == 0 && end.col == 0 && end.line > first.line {
        // Whole lines only.
        let last = (end.line - 1).min(count);
        unplace_on_lines(editor, buf, first.line, last);
        editor.delete_lines(buf, first.line, last);
        if editor.line_count(buf) == 0 {
            editor.set_final_eol(buf, false);
        }
        return;
    }

    let head = editor.line(buf, first.line).unwrap_or_default();
    let head = &head[..char_floor(&head, first.col)];
    let tail_line = if end.line > count {
        String::new()
    } else {
        editor.line(buf, end.line).unwrap_or_default()
    };
    let tail = &tail_line[char_floor(&tail_line, end.col)..];
    let merged = format!("{}{}", head, tail);

    let last_removed = end.line.min(count);
    if last_removed > first.line {
        unplace_on_lines(editor, buf, first.line + 1, last_removed);
        editor.delete_lines(buf, first.line + 1, last_removed);
    }
    editor.replace_line(buf, first.line, &merged);
    if end.line > count {
        editor.set_final_eol(buf, false);
    }
    if editor.line_count(buf) == 1
        && !editor.has_final_eol(buf)
        && editor.line(buf, 1).is_some_and(|l| l.is_empty())
    {
        editor.delete_lines(buf, 1, 1);
    }
}

#[cfg(test)]
mod tests {
    use crate::editor::{Editor, EolStyle, Position};
    use crate::test_support::{registered_buffer, session_with_editor};

    #[test]
    fn insert_into_empty_buffer_sets_lines_without_reply() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 6, "");
        session.handle_line("6:insert=1 0 \"hi\\n\"", &mut editor);
        assert_eq!(editor.lines(buf), vec!["hi"]);
        assert!(editor.has_final_eol(buf));
        assert!(session.drain_outbox().is_empty());
        assert!(!editor.is_modified(buf));
    }

    #[test]
    fn insert_function_form_replies_nil() {
        let (mut session, mut editor) = session_with_editor();
        registered_buffer(&mut session, &mut editor, 2, "abc\n");
        session.handle_line("2:insert/9 1 \"X\"", &mut editor);
        assert_eq!(session.drain_outbox(), vec!["9"]);
    }

    #[test]
    fn insert_splices_inside_a_line() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "hello world\nnext\n");
        session.handle_line("1:insert!1 5 \",\\nbig\"", &mut editor);
        assert_eq!(editor.lines(buf), vec!["hello,", "big world", "next"]);
        assert_eq!(editor.text(buf).as_deref(), Some("hello,\nbig world\nnext\n"));
    }

    #[test]
    fn insert_at_line_start_and_end_of_buffer() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "b\n");
        session.handle_line("1:insert!1 0 \"a\\n\"", &mut editor);
        assert_eq!(editor.text(buf).as_deref(), Some("a\nb\n"));
        session.handle_line("1:insert!2 4 \"c\"", &mut editor);
        assert_eq!(editor.text(buf).as_deref(), Some("a\nb\nc"));
        session.handle_line("1:insert!3 5 \"\\n\"", &mut editor);
        assert_eq!(editor.text(buf).as_deref(), Some("a\nb\nc\n"));
        assert_eq!(editor.lines(buf), vec!["a", "b", "c"]);
    }

    #[test]
    fn untranslatable_insert_offset_appends() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "ab\n");
        session.handle_line("1:insert!1 99 \"tail\\n\"", &mut editor);
        assert_eq!(editor.text(buf).as_deref(), Some("ab\ntail\n"));
    }

    #[test]
    fn crlf_text_into_empty_buffer_selects_dos_endings() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "");
        session.handle_line("1:insert!1 0 \"a\\r\\nb\\r\\n\"", &mut editor);
        assert_eq!(editor.eol_style(buf), EolStyle::Dos);
        assert_eq!(editor.lines(buf), vec!["a", "b"]);
        session.handle_line("0:getLength/2", &mut editor);
        session.handle_line("1:getLength/3", &mut editor);
        assert_eq!(session.drain_outbox(), vec!["2", "3 6"]);
    }

    #[test]
    fn insert_preserves_modified_flag() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "x\n");
        editor.set_modified(buf, true);
        session.handle_line("1:insert!1 0 \"y\"", &mut editor);
        assert!(editor.is_modified(buf));
    }

    #[test]
    fn get_length_counts_missing_final_eol() {
        let (mut session, mut editor) = session_with_editor();
        registered_buffer(&mut session, &mut editor, 3, "ab\ncd");
        session.handle_line("3:getLength/7 ", &mut editor);
        assert_eq!(session.drain_outbox(), vec!["7 5"]);
    }

    #[test]
    fn get_text_quotes_every_line() {
        let (mut session, mut editor) = session_with_editor();
        registered_buffer(&mut session, &mut editor, 1, "say \"hi\"\nok");
        session.handle_line("1:getText/4", &mut editor);
        assert_eq!(session.drain_outbox(), vec!["4 \"say \\\"hi\\\"\\nok\\n\""]);
    }

    #[test]
    fn remove_within_and_across_lines() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "hello\nworld\n");
        session.handle_line("1:remove/1 1 3", &mut editor);
        assert_eq!(editor.text(buf).as_deref(), Some("ho\nworld\n"));
        session.handle_line("1:remove/2 1 3", &mut editor);
        assert_eq!(editor.text(buf).as_deref(), Some("horld\n"));
        assert_eq!(session.drain_outbox(), vec!["1", "2"]);
        assert_eq!(editor.cursor(buf), Some(Position::new(1, 1)));
    }

    #[test]
    fn remove_whole_lines_drops_their_markers() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "a\nb\nc\n");
        editor.place_sign(buf, 1, 1, 2);
        editor.place_sign(buf, 2, 1, 3);
        session.handle_line("1:remove!1 2 2", &mut editor);
        assert_eq!(editor.text(buf).as_deref(), Some("a\nc\n"));
        let signs = editor.placed_signs(buf);
        assert_eq!(signs.len(), 1);
        assert_eq!((signs[0].id, signs[0].line), (2, 2));
    }

    #[test]
    fn remove_through_final_eol_and_everything() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "ab\ncd\n");
        session.handle_line("1:remove!1 5 1", &mut editor);
        assert_eq!(editor.text(buf).as_deref(), Some("ab\ncd"));
        session.handle_line("1:remove!2 0 5", &mut editor);
        assert_eq!(editor.line_count(buf), 0);
        session.handle_line("1:getLength/3", &mut editor);
        assert_eq!(session.drain_outbox(), vec!["3 0"]);
    }

    #[test]
    fn remove_reports_bad_position_and_count() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "abc\n");
        session.handle_line("1:remove/1 10 1", &mut editor);
        session.handle_line("1:remove/2 2 10", &mut editor);
        session.handle_line("1:remove/3 1 0", &mut editor);
        assert_eq!(
            session.drain_outbox(),
            vec!["1 !bad position", "2 !bad count", "3"]
        );
        assert_eq!(editor.text(buf).as_deref(), Some("abc\n"));
        assert!(editor.errors().is_empty());
    }

    #[test]
    fn remove_preserves_modified_flag() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "abc\n");
        session.handle_line("1:remove!1 0 1", &mut editor);
        assert!(!editor.is_modified(buf));
    }
}
