//! Verb table plus the buffer lifecycle, flag and query handlers.

use super::annotations;
use super::dispatch::{Form, Handler, Reply, Request, Target};
use super::edit;
use super::Session;
use crate::coords::{buffer_length, offset_to_position, position_to_offset, EditorLines};
use crate::editor::{BufferHandle, Editor, Position};
use crate::error::CommandError;
use crate::keys::special_key_names;
use crate::wire::Locator;
use std::collections::HashMap;
use tracing::{debug, info};

/// Every verb the session understands.
pub(super) fn table() -> HashMap<&'static str, Handler> {
    use Form::{Command, Either, Function};
    use Target::{Any, Entry, Loaded, LoadedQuiet};

    [
        ("getModified", Handler::new(Function, Any, get_modified)),
        ("saveAndExit", Handler::new(Function, Any, save_and_exit)),
        ("getCursor", Handler::new(Function, Any, get_cursor)),
        ("getAnno", Handler::new(Function, Loaded, annotations::get_anno)),
        ("getLength", Handler::new(Function, Loaded, edit::get_length)),
        ("getText", Handler::new(Function, Loaded, edit::get_text)),
        ("insert", Handler::new(Either, Loaded, edit::insert)),
        ("remove", Handler::new(Either, Loaded, edit::remove)),
        ("create", Handler::new(Command, Entry, create)),
        ("insertDone", Handler::new(Command, LoadedQuiet, insert_done)),
        ("saveDone", Handler::new(Command, LoadedQuiet, save_done)),
        ("startDocumentListen", Handler::new(Command, Entry, start_document_listen)),
        ("stopDocumentListen", Handler::new(Command, Entry, stop_document_listen)),
        ("setTitle", Handler::new(Command, Entry, set_title)),
        ("initDone", Handler::new(Command, Loaded, init_done)),
        ("setBufferNumber", Handler::new(Command, Entry, set_buffer_number)),
        ("putBufferNumber", Handler::new(Command, Entry, put_buffer_number)),
        ("setFullName", Handler::new(Command, Entry, set_full_name)),
        ("editFile", Handler::new(Command, Entry, edit_file)),
        ("setVisible", Handler::new(Command, LoadedQuiet, set_visible)),
        ("raise", Handler::new(Command, Any, raise)),
        ("setModified", Handler::new(Command, LoadedQuiet, set_modified)),
        ("setModtime", Handler::new(Command, LoadedQuiet, set_modtime)),
        ("setReadOnly", Handler::new(Command, LoadedQuiet, set_read_only)),
        ("showBalloon", Handler::new(Command, Any, show_balloon)),
        ("setDot", Handler::new(Command, Loaded, set_dot)),
        ("close", Handler::new(Command, Entry, close)),
        ("defineAnnoType", Handler::new(Command, Entry, annotations::define_anno_type)),
        ("addAnno", Handler::new(Command, Loaded, annotations::add_anno)),
        ("removeAnno", Handler::new(Command, LoadedQuiet, annotations::remove_anno)),
        ("guard", Handler::new(Command, LoadedQuiet, annotations::guard)),
        ("unguard", Handler::new(Command, LoadedQuiet, annotations::unguard)),
        ("startAtomic", Handler::new(Command, Any, start_atomic)),
        ("endAtomic", Handler::new(Command, Any, end_atomic)),
        ("save", Handler::new(Command, LoadedQuiet, save)),
        ("netbeansBuffer", Handler::new(Command, LoadedQuiet, netbeans_buffer)),
        ("specialKeys", Handler::new(Command, Any, special_keys)),
    ]
    .into_iter()
    .collect()
}

/// Resolve a location argument against a buffer.
pub(super) fn locate(
    editor: &dyn Editor,
    buf: BufferHandle,
    verb: &'static str,
    locator: Locator,
) -> Result<Position, CommandError> {
    match locator {
        Locator::LineCol(pos) => Ok(pos),
        Locator::Offset(offset) => usize::try_from(offset)
            .ok()
            .and_then(|off| offset_to_position(&EditorLines::new(editor, buf), off))
            .ok_or(CommandError::NoSuchPosition { verb, offset }),
    }
}

fn display_name(editor: &dyn Editor, buf: BufferHandle) -> String {
    editor.buffer_name(buf).unwrap_or_else(|| "[No Name]".to_string())
}

fn get_modified(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let count = match (req.bufno, req.handle) {
        (Some(bufno), Some(buf)) => {
            let tracked = session.buffers.get(bufno).is_some_and(|e| e.modified);
            i64::from(editor.is_modified(buf) || tracked)
        }
        _ => editor.modified_count() as i64,
    };
    Ok(Reply::Number(count))
}

fn save_and_exit(
    _session: &mut Session,
    editor: &mut dyn Editor,
    _req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    info!("tool requested save and exit");
    editor.quit_all();
    Ok(Reply::Number(editor.modified_count() as i64))
}

fn get_cursor(
    session: &mut Session,
    editor: &mut dyn Editor,
    _req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let Some(buf) = editor.current_buffer() else {
        return Ok(Reply::Text("-1 0 0 0".to_string()));
    };
    let bufno = session
        .buffers
        .find_by_handle(buf)
        .map_or(-1, i64::from);
    let pos = editor.cursor(buf).unwrap_or(Position::new(1, 0));
    let offset = position_to_offset(&EditorLines::new(editor, buf), pos).unwrap_or(0);
    Ok(Reply::Text(format!(
        "{} {} {} {}",
        bufno, pos.line, pos.col, offset
    )))
}

fn create(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let bufno = req.bufno()?;
    let buf = editor.create_buffer(None);
    editor.show_buffer(buf);
    let entry = session.buffers.entry(bufno);
    entry.handle = Some(buf);
    entry.display_name = None;
    entry.insert_done = false;
    debug!(bufno, %buf, "created buffer");
    Ok(Reply::Nil)
}

fn insert_done(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    let start_eol = req.args.flag().unwrap_or(false);
    let read_only = req.args.flag().unwrap_or(false);
    session.buffers.entry(bufno).insert_done = true;
    editor.set_read_only(buf, read_only);

    let mut message = format!("\"{}\"", display_name(editor, buf));
    if read_only {
        message.push_str(" [readonly]");
    }
    if !start_eol {
        message.push_str(" [Incomplete last line]");
    }
    let length = buffer_length(&EditorLines::new(editor, buf));
    message.push_str(&format!(" {}L, {}B", editor.line_count(buf), length));
    editor.show_message(&message);
    Ok(Reply::Nil)
}

fn save_done(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (_, buf) = req.loaded()?;
    let saved = req.args.number().unwrap_or(0);
    let name = display_name(editor, buf);
    if saved >= 0 {
        let lines = editor.line_count(buf);
        editor.show_message(&format!("\"{}\" {}L, {}B written", name, lines, saved));
    } else {
        editor.report_error(&format!("\"{}\" is read-only (add ! to override)", name));
    }
    Ok(Reply::Nil)
}

fn start_document_listen(
    session: &mut Session,
    _editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    session.buffers.entry(req.bufno()?).fire_changes = true;
    Ok(Reply::Nil)
}

fn stop_document_listen(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let bufno = req.bufno()?;
    let entry = session.buffers.entry(bufno);
    entry.fire_changes = false;
    let Some(buf) = entry.handle else {
        return Ok(Reply::Nil);
    };
    if !entry.was_owned {
        return Ok(Reply::Nil);
    }
    if !entry.owned {
        return Err(CommandError::ConnectionLost(bufno));
    }
    // The tool stopped editing a buffer it owns: the local copy goes away.
    editor.wipe_buffer(buf);
    session.buffers.reset(bufno);
    session.signs.forget_buffer(bufno);
    info!(bufno, "tool released owned buffer");
    Ok(Reply::Nil)
}

fn set_title(
    session: &mut Session,
    _editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let bufno = req.bufno()?;
    let title = req.args.quoted().unwrap_or_default();
    session.buffers.entry(bufno).display_name = Some(title);
    Ok(Reply::Nil)
}

fn init_done(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    session.buffers.entry(bufno).init_done = true;
    editor.show_buffer(buf);
    req.update = true;
    session.replay_pending_keys(editor);
    Ok(Reply::Nil)
}

fn bind_buffer_number(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
    show: bool,
) -> Result<Reply, CommandError> {
    let bufno = req.bufno()?;
    let path = req.args.quoted().ok_or_else(|| req.bad_argument())?;
    let buf = editor
        .find_buffer(&path)
        .ok_or(CommandError::FileNotFound(path))?;
    let entry = session.buffers.entry(bufno);
    entry.handle = Some(buf);
    if show {
        editor.show_buffer(buf);
    } else {
        entry.init_done = true;
    }
    debug!(bufno, %buf, "bound buffer number");
    session.replay_pending_keys(editor);
    Ok(Reply::Nil)
}

fn set_buffer_number(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    bind_buffer_number(session, editor, req, true)
}

fn put_buffer_number(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    bind_buffer_number(session, editor, req, false)
}

fn set_full_name(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let bufno = req.bufno()?;
    let name = req.args.quoted().ok_or_else(|| req.bad_argument())?;
    let buf = editor.create_buffer(Some(&name));
    editor.show_buffer(buf);
    let entry = session.buffers.entry(bufno);
    entry.handle = Some(buf);
    entry.display_name = Some(name);
    Ok(Reply::Nil)
}

fn edit_file(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let bufno = req.bufno()?;
    let name = req.args.quoted().ok_or_else(|| req.bad_argument())?;
    let buf = editor.edit_file(&name);
    let entry = session.buffers.entry(bufno);
    entry.handle = Some(buf);
    entry.display_name = Some(name);
    entry.init_done = true;
    req.update = true;
    Ok(Reply::Nil)
}

fn set_visible(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (_, buf) = req.loaded()?;
    if req.args.flag() == Some(true) && editor.current_buffer() != Some(buf) {
        editor.show_buffer(buf);
        req.update = true;
    }
    Ok(Reply::Nil)
}

fn raise(
    _session: &mut Session,
    editor: &mut dyn Editor,
    _req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    editor.raise();
    Ok(Reply::Nil)
}

fn set_modified(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    let value = req.args.flag() == Some(true);
    let before = editor.is_modified(buf);
    editor.set_modified(buf, value);
    session.buffers.entry(bufno).modified = value;
    if before != value {
        req.update = true;
    }
    Ok(Reply::Nil)
}

fn set_modtime(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (_, buf) = req.loaded()?;
    let mtime = req.args.number().ok_or_else(|| req.bad_argument())?;
    editor.set_mtime(buf, mtime);
    Ok(Reply::Nil)
}

fn set_read_only(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (_, buf) = req.loaded()?;
    editor.set_read_only(buf, req.args.flag() == Some(true));
    Ok(Reply::Nil)
}

fn show_balloon(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    if let Some(text) = req.args.quoted() {
        editor.show_balloon(&text);
    }
    Ok(Reply::Nil)
}

fn set_dot(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (_, buf) = req.loaded()?;
    let locator = req.args.locator().ok_or_else(|| req.bad_argument())?;
    editor.show_buffer(buf);
    req.update = true;
    let pos = locate(editor, buf, req.verb, locator)?;
    editor.set_cursor(buf, pos);
    Ok(Reply::Nil)
}

fn close(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let bufno = req.bufno()?;
    match req.handle {
        Some(buf) => {
            editor.wipe_buffer(buf);
            debug!(bufno, %buf, "closed buffer");
        }
        None => debug!(bufno, "close for a buffer that is not loaded"),
    }
    session.buffers.reset(bufno);
    session.signs.forget_buffer(bufno);
    req.update = true;
    Ok(Reply::Nil)
}

fn start_atomic(
    session: &mut Session,
    _editor: &mut dyn Editor,
    _req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    session.atomic.begin();
    Ok(Reply::Nil)
}

fn end_atomic(
    session: &mut Session,
    editor: &mut dyn Editor,
    _req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    if session.atomic.end() {
        editor.redraw();
    }
    Ok(Reply::Nil)
}

fn save(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    let tracked = session.buffers.get(bufno).is_some_and(|e| e.modified);
    if !(editor.is_modified(buf) || tracked) {
        debug!(bufno, "buffer has no changes");
        return Ok(Reply::Nil);
    }
    if editor.is_read_only(buf) || editor.buffer_name(buf).is_none() {
        debug!(bufno, "buffer cannot be written");
        return Ok(Reply::Nil);
    }
    editor
        .write_buffer(buf)
        .map_err(|message| CommandError::WriteFailed { bufno, message })?;
    Ok(Reply::Nil)
}

fn netbeans_buffer(
    session: &mut Session,
    _editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, _) = req.loaded()?;
    let owned = req.args.flag() == Some(true);
    let entry = session.buffers.entry(bufno);
    entry.owned = owned;
    if owned {
        entry.was_owned = true;
    }
    Ok(Reply::Nil)
}

fn special_keys(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let keys = req
        .args
        .quoted()
        .unwrap_or_else(|| req.args.rest().to_string());
    for key in special_key_names(&keys) {
        editor.map_special_key(&key);
    }
    Ok(Reply::Nil)
}

#[cfg(test)]
mod tests {
    use crate::editor::{Editor, Position};
    use crate::error::CommandError;
    use crate::test_support::{registered_buffer, session_with_editor};

    #[test]
    fn get_modified_reports_one_buffer_or_the_count() {
        let (mut session, mut editor) = session_with_editor();
        let a = registered_buffer(&mut session, &mut editor, 1, "a\n");
        registered_buffer(&mut session, &mut editor, 2, "b\n");
        editor.set_modified(a, true);

        session.handle_line("1:getModified/1", &mut editor);
        session.handle_line("2:getModified/2", &mut editor);
        session.handle_line("0:getModified/3", &mut editor);
        assert_eq!(session.drain_outbox(), vec!["1 1", "2 0", "3 1"]);
    }

    #[test]
    fn save_and_exit_asks_host_to_quit_and_counts_modified() {
        let (mut session, mut editor) = session_with_editor();
        let a = registered_buffer(&mut session, &mut editor, 1, "a\n");
        editor.set_modified(a, true);
        session.handle_line("0:saveAndExit/4", &mut editor);
        assert!(editor.quit_requested());
        assert_eq!(session.drain_outbox(), vec!["4 1"]);
    }

    #[test]
    fn get_cursor_reports_buffer_position_and_offset() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 3, "ab\ncd\n");
        editor.show_buffer(buf);
        editor.set_cursor(buf, Position::new(2, 1));
        session.handle_line("0:getCursor/5", &mut editor);

        let other = editor.create_buffer(Some("/tmp/unregistered.txt"));
        editor.show_buffer(other);
        session.handle_line("0:getCursor/6", &mut editor);
        assert_eq!(session.drain_outbox(), vec!["5 3 2 1 4", "6 -1 1 0 0"]);
    }

    #[test]
    fn create_then_set_full_name_binds_buffers() {
        let (mut session, mut editor) = session_with_editor();
        session.handle_line("4:create!1", &mut editor);
        let created = session.buffers().get(4).and_then(|e| e.handle).expect("bound");
        assert_eq!(editor.current_buffer(), Some(created));

        session.handle_line("5:setFullName!2 \"/tmp/full.txt\"", &mut editor);
        let named = session.buffers().get(5).and_then(|e| e.handle).expect("bound");
        assert_eq!(editor.buffer_name(named).as_deref(), Some("/tmp/full.txt"));
        session.handle_line("6:setFullName!3 \"/tmp/full.txt\"", &mut editor);
        assert_eq!(session.buffers().get(6).and_then(|e| e.handle), Some(named));
    }

    #[test]
    fn set_buffer_number_requires_an_existing_buffer() {
        let (mut session, mut editor) = session_with_editor();
        session.handle_line("2:setBufferNumber!1 \"/tmp/missing.txt\"", &mut editor);
        assert_eq!(editor.errors().len(), 1);
        assert!(editor.errors()[0].contains("/tmp/missing.txt"));

        let buf = editor.create_buffer(Some("/tmp/present.txt"));
        session.handle_line("2:putBufferNumber!2 \"/tmp/present.txt\"", &mut editor);
        let entry = session.buffers().get(2).expect("entry");
        assert_eq!(entry.handle, Some(buf));
        assert!(entry.init_done);
    }

    #[test]
    fn edit_file_reads_disk_and_marks_init_done() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("edit.txt");
        std::fs::write(&path, "from disk\n").expect("write");
        let (mut session, mut editor) = session_with_editor();
        session.handle_line(&format!("7:editFile!1 \"{}\"", path.display()), &mut editor);
        let entry = session.buffers().get(7).expect("entry");
        let buf = entry.handle.expect("bound");
        assert!(entry.init_done);
        assert_eq!(editor.lines(buf), vec!["from disk"]);
        assert_eq!(editor.redraw_count(), 1);
    }

    #[test]
    fn flags_and_metadata_commands_update_the_host() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "x\n");
        session.handle_line("1:setReadOnly!1 T", &mut editor);
        session.handle_line("1:setModified!2 T", &mut editor);
        session.handle_line("1:setModtime!3 1700000000", &mut editor);
        session.handle_line("1:setTitle!4 \"Title\"", &mut editor);
        session.handle_line("0:showBalloon!5 \"x = 1\"", &mut editor);
        session.handle_line("0:raise!6", &mut editor);
        assert!(editor.is_read_only(buf));
        assert!(editor.is_modified(buf));
        assert!(session.buffers().get(1).expect("entry").modified);
        assert_eq!(editor.mtime(buf), Some(1_700_000_000));
        assert_eq!(
            session.buffers().get(1).and_then(|e| e.display_name.clone()).as_deref(),
            Some("Title")
        );
        assert_eq!(editor.balloons(), ["x = 1".to_string()]);
        assert_eq!(editor.raise_count(), 1);
    }

    #[test]
    fn insert_done_sets_read_only_and_shows_a_message() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "x\ny");
        session.buffers.entry(1).insert_done = false;
        session.handle_line("1:insertDone!1 F T", &mut editor);
        assert!(session.buffers().get(1).expect("entry").insert_done);
        assert!(editor.is_read_only(buf));
        let message = editor.messages().last().expect("message");
        assert!(message.contains("[readonly]"));
        assert!(message.contains("[Incomplete last line]"));
        assert!(message.ends_with("2L, 3B"));
    }

    #[test]
    fn save_done_shows_message_or_read_only_error() {
        let (mut session, mut editor) = session_with_editor();
        registered_buffer(&mut session, &mut editor, 1, "x\n");
        session.handle_line("1:saveDone!1 2", &mut editor);
        assert!(editor.messages().last().expect("message").ends_with("2B written"));
        session.handle_line("1:saveDone!2 -1", &mut editor);
        assert!(editor.errors()[0].contains("read-only"));
    }

    #[test]
    fn set_dot_moves_cursor_by_offset_or_line_col() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "ab\ncd\n");
        session.handle_line("1:setDot!1 4", &mut editor);
        assert_eq!(editor.cursor(buf), Some(Position::new(2, 1)));
        session.handle_line("1:setDot!2 1/1", &mut editor);
        assert_eq!(editor.cursor(buf), Some(Position::new(1, 1)));
        session.handle_line("1:setDot!3 99", &mut editor);
        assert_eq!(editor.cursor(buf), Some(Position::new(1, 1)));
        assert_eq!(editor.errors().len(), 1);
        assert_eq!(editor.current_buffer(), Some(buf));
    }

    #[test]
    fn close_wipes_buffer_and_forgets_bindings() {
        let (mut session, mut editor) = session_with_editor();
        let buf = registered_buffer(&mut session, &mut editor, 1, "x\n");
        session.signs.bind_local(1, 1, 1);
        session.handle_line("1:close!1", &mut editor);
        assert!(editor.buffer_name(buf).is_none());
        assert!(session.buffers().get(1).expect("entry").handle.is_none());
        assert_eq!(session.signs().resolve(1, 1), 0);
    }

    #[test]
    fn stop_document_listen_releases_owned_buffers() {
        let (mut session, mut editor) = session_with_editor();
        let owned = registered_buffer(&mut session, &mut editor, 1, "x\n");
        session.handle_line("1:netbeansBuffer!1 T", &mut editor);
        session.handle_line("1:stopDocumentListen!2", &mut editor);
        assert!(editor.buffer_name(owned).is_none());
        assert!(session.buffers().get(1).expect("entry").handle.is_none());

        registered_buffer(&mut session, &mut editor, 2, "y\n");
        session.handle_line("2:netbeansBuffer!3 T", &mut editor);
        session.handle_line("2:netbeansBuffer!4 F", &mut editor);
        session.handle_line("2:stopDocumentListen!5", &mut editor);
        assert_eq!(editor.errors(), [CommandError::ConnectionLost(2).to_string()]);
        assert!(!session.buffers().get(2).expect("entry").fire_changes);

        registered_buffer(&mut session, &mut editor, 3, "z\n");
        session.handle_line("3:stopDocumentListen!6", &mut editor);
        session.handle_line("3:startDocumentListen!7", &mut editor);
        assert!(session.buffers().get(3).expect("entry").fire_changes);
        assert_eq!(editor.errors().len(), 1);
    }

    #[test]
    fn save_writes_only_modified_writable_named_buffers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("saved.txt");
        let (mut session, mut editor) = session_with_editor();
        let buf = editor.create_buffer(Some(&path.display().to_string()));
        editor.set_text(buf, "keep\n");
        session.buffers.entry(1).handle = Some(buf);

        session.handle_line("1:save!1", &mut editor);
        assert!(!path.exists());

        editor.set_modified(buf, true);
        session.handle_line("1:save!2", &mut editor);
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "keep\n");
    }

    #[test]
    fn special_keys_are_mapped_in_host_form() {
        let (mut session, mut editor) = session_with_editor();
        session.handle_line("0:specialKeys!1 \"F2 CS-F3\"", &mut editor);
        assert_eq!(editor.mapped_keys(), ["F2".to_string(), "C-S-F3".to_string()]);
    }
}
