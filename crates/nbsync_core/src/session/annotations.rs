//! Marker handlers: `defineAnnoType`, `addAnno`, `removeAnno`, `getAnno`,
//! `guard`, `unguard`.

use super::dispatch::{Reply, Request};
use super::handlers::locate;
use super::Session;
use crate::editor::{BufferHandle, Editor, Position};
use crate::error::CommandError;
use crate::signs::{AnnoTypeDef, SignRegistry};
use crate::wire::{Args, Locator};
use tracing::debug;

/// A color argument may be quoted or a bare word.
fn color_arg(args: &mut Args<'_>) -> String {
    args.quoted()
        .or_else(|| args.word().map(str::to_string))
        .unwrap_or_default()
}

fn placement_id(req: &mut Request<'_>) -> Result<u32, CommandError> {
    let raw = req.args.number().ok_or_else(|| req.bad_argument())?;
    u32::try_from(raw).map_err(|_| req.bad_argument())
}

pub(super) fn define_anno_type(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let bufno = req.bufno()?;
    let local_id = req.args.number().ok_or_else(|| req.bad_argument())?;
    let local_id = u32::try_from(local_id).map_err(|_| req.bad_argument())?;
    let def = AnnoTypeDef {
        name: req.args.quoted().ok_or_else(|| req.bad_argument())?,
        tooltip: req.args.quoted().unwrap_or_default(),
        glyph: req.args.quoted().unwrap_or_default(),
        fg: color_arg(&mut req.args),
        bg: color_arg(&mut req.args),
    };
    let global_id = session.signs.define_type(&def, editor)?;
    session.signs.bind_local(bufno, local_id, global_id);
    debug!(bufno, local_id, global_id, name = %def.name, "bound marker type");
    Ok(Reply::Nil)
}

pub(super) fn add_anno(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    let id = placement_id(req)?;
    SignRegistry::check_annotation_id(id)?;
    let local_type = req.args.number().ok_or_else(|| req.bad_argument())?;
    let type_id = u32::try_from(local_type)
        .map(|local| session.signs.resolve(bufno, local))
        .unwrap_or(0);
    if type_id == 0 {
        return Err(CommandError::UnknownAnnoType(local_type));
    }
    let locator = req.args.locator().ok_or_else(|| req.bad_argument())?;
    let pos = locate(editor, buf, req.verb, locator)?;

    editor.place_sign(buf, id, type_id, pos.line);
    if session.signs.is_current_pc(type_id) {
        editor.jump_to_sign(buf, id);
    }
    debug!(bufno, id, type_id, line = pos.line, "placed marker");
    req.update = true;
    Ok(Reply::Nil)
}

pub(super) fn remove_anno(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    let id = placement_id(req)?;
    if !editor.unplace_sign(buf, id) {
        debug!(bufno, id, "no such marker");
    }
    req.update = true;
    Ok(Reply::Nil)
}

pub(super) fn get_anno(
    _session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (_, buf) = req.loaded()?;
    let id = placement_id(req)?;
    let line = editor
        .placed_signs(buf)
        .into_iter()
        .find(|sign| sign.id == id)
        .map_or(0, |sign| sign.line);
    Ok(Reply::Number(line as i64))
}

/// Lines covered by `off len`.
///
/// A range ending right after a line break does not cover the line that
/// follows it.
fn guarded_lines(
    editor: &dyn Editor,
    buf: BufferHandle,
    req: &mut Request<'_>,
) -> Result<(usize, usize), CommandError> {
    let offset = req.args.number().ok_or_else(|| req.bad_argument())?;
    let length = req.args.number().ok_or_else(|| req.bad_argument())?;
    let verb = req.verb;
    let at = |off: i64| locate(editor, buf, verb, Locator::Offset(off));

    let first = at(offset)?;
    if length <= 1 {
        return Ok((first.line, first.line));
    }
    let end = offset
        .checked_add(length)
        .ok_or(CommandError::NoSuchPosition { verb, offset })?;
    let mut last: Position = at(end - 1)?;
    if last.col == 0 {
        last = at(end - 2)?;
    }
    Ok((first.line, last.line.max(first.line)))
}

pub(super) fn guard(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    let (first, last) = guarded_lines(editor, buf, req)?;
    session.signs.guard_lines(editor, buf, first, last);
    debug!(bufno, first, last, "guarded lines");
    req.update = true;
    Ok(Reply::Nil)
}

pub(super) fn unguard(
    session: &mut Session,
    editor: &mut dyn Editor,
    req: &mut Request<'_>,
) -> Result<Reply, CommandError> {
    let (bufno, buf) = req.loaded()?;
    let (first, last) = guarded_lines(editor, buf, req)?;
    session.signs.unguard_lines(editor, buf, first, last);
    debug!(bufno, first, last, "unguarded lines");
    req.update = true;
    Ok(Reply::Nil)
}
