//! Marker-type registry shared by all buffers of one connection.
//!
//! Marker type names are deduplicated globally: the first definition of a
//! name gets the next global id and is handed to the host once. Each buffer
//! refers to types through its own local numbering, mapped here.

use crate::constants::{
    CURRENT_PC_TYPE_NAME, GUARDED_HIGHLIGHT, GUARDED_TYPE, GUARD_BASE, MAX_COLOR_LENGTH,
};
use crate::editor::{BufferHandle, Editor, SignGlyph, SignHighlight, SignStyle};
use crate::error::CommandError;
use std::collections::HashMap;
use tracing::debug;

/// Arguments of a `defineAnnoType` command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnoTypeDef {
    pub name: String,
    pub tooltip: String,
    pub glyph: String,
    pub fg: String,
    pub bg: String,
}

impl AnnoTypeDef {
    /// Host presentation for this definition.
    ///
    /// # Errors
    /// Returns [`CommandError::ColorTooLong`] for color names over the limit.
    pub fn style(&self) -> Result<SignStyle, CommandError> {
        if self.fg.len() > MAX_COLOR_LENGTH || self.bg.len() > MAX_COLOR_LENGTH {
            return Err(CommandError::ColorTooLong);
        }
        let fg = color(&self.fg);
        let bg = color(&self.bg);
        let glyph = if self.glyph.is_empty() {
            SignGlyph::None
        } else if self.glyph.chars().count() <= 2 {
            SignGlyph::Text(self.glyph.clone())
        } else {
            SignGlyph::Icon(self.glyph.clone())
        };
        let highlight = (fg.is_some() || bg.is_some()).then(|| SignHighlight {
            group: format!("NB_{}", self.name),
            fg,
            bg,
        });
        Ok(SignStyle {
            name: self.name.clone(),
            tooltip: self.tooltip.clone(),
            glyph,
            highlight,
        })
    }
}

/// Normalise a color argument: numeric values become `#rrggbb`, empty and
/// `none` mean "unset", anything else is a color name.
fn color(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        return None;
    }
    match value.parse::<i64>() {
        Ok(number) => Some(format!("#{:06x}", number & 0xFF_FFFF)),
        Err(_) => Some(value.to_string()),
    }
}

/// Global marker-type table plus per-buffer local bindings.
#[derive(Debug)]
pub struct SignRegistry {
    by_name: HashMap<String, u32>,
    next_id: u32,
    local: HashMap<(u32, u32), u32>,
    guard_defined: bool,
    next_guard_id: u32,
    current_pc: Option<u32>,
}

impl Default for SignRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SignRegistry {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            next_id: 1,
            local: HashMap::new(),
            guard_defined: false,
            next_guard_id: GUARD_BASE,
            current_pc: None,
        }
    }

    /// Define a marker type, reusing the global id of an identical name.
    ///
    /// # Returns
    /// The global type id. Only the first definition of a name reaches the
    /// host.
    ///
    /// # Errors
    /// Returns [`CommandError::ColorTooLong`] from [`AnnoTypeDef::style`].
    pub fn define_type(
        &mut self,
        def: &AnnoTypeDef,
        editor: &mut dyn Editor,
    ) -> Result<u32, CommandError> {
        if let Some(&id) = self.by_name.get(&def.name) {
            return Ok(id);
        }
        let style = def.style()?;
        let id = self.next_id;
        self.next_id += 1;
        if self.next_id == GUARDED_TYPE {
            self.next_id += 1;
        }
        editor.define_sign(id, &style);
        self.by_name.insert(def.name.clone(), id);
        if def.name == CURRENT_PC_TYPE_NAME {
            self.current_pc = Some(id);
        }
        debug!(id, name = %def.name, "defined marker type");
        Ok(id)
    }

    /// Bind a buffer-local type number to a global id; re-binding is a no-op.
    pub fn bind_local(&mut self, bufno: u32, local_id: u32, global_id: u32) {
        self.local.entry((bufno, local_id)).or_insert(global_id);
    }

    /// Global id for a buffer-local type number, 0 when unbound.
    pub fn resolve(&self, bufno: u32, local_id: u32) -> u32 {
        self.local.get(&(bufno, local_id)).copied().unwrap_or(0)
    }

    /// Drop all local bindings of one buffer.
    pub fn forget_buffer(&mut self, bufno: u32) {
        self.local.retain(|(owner, _), _| *owner != bufno);
    }

    pub fn is_current_pc(&self, global_id: u32) -> bool {
        global_id != 0 && self.current_pc == Some(global_id)
    }

    /// Reject placement ids that belong to guarded regions.
    pub fn check_annotation_id(id: u32) -> Result<(), CommandError> {
        if id >= GUARD_BASE {
            return Err(CommandError::AnnotationIdReserved(id));
        }
        Ok(())
    }

    fn ensure_guard_type(&mut self, editor: &mut dyn Editor) {
        if self.guard_defined {
            return;
        }
        let style = SignStyle {
            name: GUARDED_HIGHLIGHT.to_string(),
            tooltip: String::new(),
            glyph: SignGlyph::None,
            highlight: Some(SignHighlight {
                group: GUARDED_HIGHLIGHT.to_string(),
                fg: Some("Black".to_string()),
                bg: Some("LightCyan".to_string()),
            }),
        };
        editor.define_sign(GUARDED_TYPE, &style);
        self.guard_defined = true;
    }

    /// Place a guard marker on every line of `first..=last` that lacks one.
    pub fn guard_lines(
        &mut self,
        editor: &mut dyn Editor,
        buf: BufferHandle,
        first: usize,
        last: usize,
    ) {
        self.ensure_guard_type(editor);
        let guarded: Vec<usize> = editor
            .placed_signs(buf)
            .into_iter()
            .filter(|sign| sign.type_id == GUARDED_TYPE)
            .map(|sign| sign.line)
            .collect();
        for line in first..=last {
            if guarded.contains(&line) {
                continue;
            }
            let id = self.next_guard_id;
            self.next_guard_id += 1;
            editor.place_sign(buf, id, GUARDED_TYPE, line);
        }
    }

    /// Remove guard markers on the lines `first..=last`.
    pub fn unguard_lines(
        &mut self,
        editor: &mut dyn Editor,
        buf: BufferHandle,
        first: usize,
        last: usize,
    ) {
        let doomed: Vec<u32> = editor
            .placed_signs(buf)
            .into_iter()
            .filter(|s| s.type_id == GUARDED_TYPE && (first..=last).contains(&s.line))
            .map(|s| s.id)
            .collect();
        for id in doomed {
            editor.unplace_sign(buf, id);
        }
    }
}

/// Whether any line strictly between `top` and `bot` is guarded.
pub fn is_guarded(editor: &dyn Editor, buf: BufferHandle, top: usize, bot: usize) -> bool {
    editor
        .placed_signs(buf)
        .iter()
        .any(|sign| sign.id >= GUARD_BASE && sign.line > top && sign.line < bot)
}

/// Cycle the ordinary markers on `line`: the first one moves behind the
/// others, guard markers stay last.
///
/// # Returns
/// `true` when the order changed.
pub fn gutter_click(editor: &mut dyn Editor, buf: BufferHandle, line: usize) -> bool {
    let on_line: Vec<_> = editor
        .placed_signs(buf)
        .into_iter()
        .filter(|sign| sign.line == line)
        .collect();
    let (mut ordinary, guards): (Vec<_>, Vec<_>) =
        on_line.into_iter().partition(|sign| sign.id < GUARD_BASE);
    if ordinary.len() < 2 {
        return false;
    }
    ordinary.rotate_left(1);
    let order: Vec<u32> = ordinary
        .iter()
        .chain(guards.iter())
        .map(|sign| sign.id)
        .collect();
    editor.reorder_signs(buf, line, &order);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEditor;

    fn def(name: &str, glyph: &str, fg: &str, bg: &str) -> AnnoTypeDef {
        AnnoTypeDef {
            name: name.to_string(),
            tooltip: format!("{} tip", name),
            glyph: glyph.to_string(),
            fg: fg.to_string(),
            bg: bg.to_string(),
        }
    }

    #[test]
    fn define_type_dedups_by_exact_name() {
        let mut editor = MemoryEditor::new();
        let mut signs = SignRegistry::new();
        let first = signs
            .define_type(&def("Error", "E>", "", ""), &mut editor)
            .expect("define");
        let again = signs
            .define_type(&def("Error", "other.png", "255", ""), &mut editor)
            .expect("define");
        let other = signs
            .define_type(&def("error", "", "", ""), &mut editor)
            .expect("define");
        assert_eq!(first, 1);
        assert_eq!(again, first);
        assert_eq!(other, 2);
        assert_eq!(editor.sign_types().len(), 2);
    }

    #[test]
    fn type_ids_skip_the_guarded_type() {
        let mut editor = MemoryEditor::new();
        let mut signs = SignRegistry::new();
        signs.next_id = GUARDED_TYPE - 1;
        let below = signs
            .define_type(&def("Below", "", "", ""), &mut editor)
            .expect("define");
        let above = signs
            .define_type(&def("Above", "", "", ""), &mut editor)
            .expect("define");
        assert_eq!(below, GUARDED_TYPE - 1);
        assert_eq!(above, GUARDED_TYPE + 1);
        assert!(!editor.sign_types().contains_key(&GUARDED_TYPE));
    }

    #[test]
    fn local_bindings_are_per_buffer_and_sticky() {
        let mut signs = SignRegistry::new();
        signs.bind_local(3, 1, 7);
        signs.bind_local(3, 1, 9);
        signs.bind_local(4, 1, 9);
        assert_eq!(signs.resolve(3, 1), 7);
        assert_eq!(signs.resolve(4, 1), 9);
        assert_eq!(signs.resolve(3, 2), 0);
        signs.forget_buffer(3);
        assert_eq!(signs.resolve(3, 1), 0);
        assert_eq!(signs.resolve(4, 1), 9);
    }

    #[test]
    fn style_maps_glyphs_and_colors() {
        let style = def("Bp", "B", "255", "none").style().expect("style");
        assert_eq!(style.glyph, SignGlyph::Text("B".to_string()));
        let hl = style.highlight.expect("highlight");
        assert_eq!(hl.group, "NB_Bp");
        assert_eq!(hl.fg.as_deref(), Some("#0000ff"));
        assert_eq!(hl.bg, None);

        let style = def("Icon", "/tmp/bp.xpm", "", "").style().expect("style");
        assert_eq!(style.glyph, SignGlyph::Icon("/tmp/bp.xpm".to_string()));
        assert!(style.highlight.is_none());

        let style = def("Neg", "", "-1", "Red").style().expect("style");
        let hl = style.highlight.expect("highlight");
        assert_eq!(hl.fg.as_deref(), Some("#ffffff"));
        assert_eq!(hl.bg.as_deref(), Some("Red"));

        let long = "x".repeat(MAX_COLOR_LENGTH + 1);
        assert_eq!(
            def("Long", "", &long, "").style(),
            Err(CommandError::ColorTooLong)
        );
    }

    #[test]
    fn current_pc_type_is_remembered() {
        let mut editor = MemoryEditor::new();
        let mut signs = SignRegistry::new();
        signs
            .define_type(&def("Error", "", "", ""), &mut editor)
            .expect("define");
        let pc = signs
            .define_type(&def(CURRENT_PC_TYPE_NAME, "=>", "", ""), &mut editor)
            .expect("define");
        assert!(signs.is_current_pc(pc));
        assert!(!signs.is_current_pc(1));
        assert!(!signs.is_current_pc(0));
    }

    #[test]
    fn guards_are_placed_once_and_detected_strictly_inside() {
        let mut editor = MemoryEditor::new();
        let buf = editor.create_buffer(Some("/tmp/guard.txt"));
        editor.set_text(buf, "a\nb\nc\nd\n");
        let mut signs = SignRegistry::new();

        signs.guard_lines(&mut editor, buf, 2, 3);
        signs.guard_lines(&mut editor, buf, 3, 3);
        let guards: Vec<_> = editor
            .placed_signs(buf)
            .into_iter()
            .filter(|s| s.type_id == GUARDED_TYPE)
            .collect();
        assert_eq!(guards.len(), 2);
        assert!(guards.iter().all(|s| s.id >= GUARD_BASE));
        assert_eq!(editor.sign_types().len(), 1);

        assert!(is_guarded(&editor, buf, 1, 3));
        assert!(!is_guarded(&editor, buf, 3, 4));
        assert!(!is_guarded(&editor, buf, 2, 3));

        signs.unguard_lines(&mut editor, buf, 1, 2);
        assert!(!is_guarded(&editor, buf, 1, 3));
        assert!(is_guarded(&editor, buf, 2, 4));
    }

    #[test]
    fn annotation_ids_in_guard_space_are_rejected() {
        assert!(SignRegistry::check_annotation_id(GUARD_BASE - 1).is_ok());
        assert_eq!(
            SignRegistry::check_annotation_id(GUARD_BASE),
            Err(CommandError::AnnotationIdReserved(GUARD_BASE))
        );
    }

    #[test]
    fn gutter_click_cycles_ordinary_markers_and_keeps_guards_last() {
        let mut editor = MemoryEditor::new();
        let buf = editor.create_buffer(Some("/tmp/click.txt"));
        editor.set_text(buf, "one\ntwo\n");
        let mut signs = SignRegistry::new();
        editor.place_sign(buf, 1, 1, 1);
        signs.guard_lines(&mut editor, buf, 1, 1);
        editor.place_sign(buf, 2, 1, 1);
        editor.place_sign(buf, 3, 2, 1);

        assert!(gutter_click(&mut editor, buf, 1));
        let ids: Vec<u32> = editor.placed_signs(buf).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3, 1, GUARD_BASE]);

        assert!(!gutter_click(&mut editor, buf, 2));
    }
}
