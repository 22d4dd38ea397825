//! Protocol buffer-id registry.

use crate::editor::BufferHandle;
use std::collections::BTreeMap;

/// Per-buffer protocol state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEntry {
    /// Host buffer bound to this id, if any yet.
    pub handle: Option<BufferHandle>,
    /// Whether local edits are reported as change events.
    pub fire_changes: bool,
    pub init_done: bool,
    pub insert_done: bool,
    pub modified: bool,
    /// The tool owns the buffer's contents (`netbeansBuffer T`).
    pub owned: bool,
    pub was_owned: bool,
    pub display_name: Option<String>,
}

impl Default for BufferEntry {
    fn default() -> Self {
        Self {
            handle: None,
            fire_changes: true,
            init_done: false,
            insert_done: false,
            modified: false,
            owned: false,
            was_owned: false,
            display_name: None,
        }
    }
}

/// Mapping from protocol buffer ids (>= 1) to [`BufferEntry`].
#[derive(Debug, Default)]
pub struct BufferRegistry {
    entries: BTreeMap<u32, BufferEntry>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a wire buffer number to an id; ids <= 0 address no buffer.
    pub fn id_of(bufno: i64) -> Option<u32> {
        u32::try_from(bufno).ok().filter(|id| *id > 0)
    }

    /// Entry for `bufno`, created on first reference.
    pub fn entry(&mut self, bufno: u32) -> &mut BufferEntry {
        self.entries.entry(bufno).or_default()
    }

    pub fn get(&self, bufno: u32) -> Option<&BufferEntry> {
        self.entries.get(&bufno)
    }

    pub fn get_mut(&mut self, bufno: u32) -> Option<&mut BufferEntry> {
        self.entries.get_mut(&bufno)
    }

    /// Reverse lookup from a host buffer to its protocol id.
    pub fn find_by_handle(&self, handle: BufferHandle) -> Option<u32> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.handle == Some(handle))
            .map(|(bufno, _)| *bufno)
    }

    /// Return an entry to its initial state, unbinding its host buffer.
    pub fn reset(&mut self, bufno: u32) {
        if let Some(entry) = self.entries.get_mut(&bufno) {
            *entry = BufferEntry::default();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Registered entries that are bound to a host buffer.
    pub fn bound(&self) -> impl Iterator<Item = (u32, BufferHandle)> + '_ {
        self.entries
            .iter()
            .filter_map(|(bufno, entry)| entry.handle.map(|handle| (*bufno, handle)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
