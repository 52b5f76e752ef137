//! The tracker's current belief about directory contents

use crate::entry::Entry;
use std::collections::BTreeMap;

/// Entries currently tracked, keyed by name
///
/// Owned by exactly one watch session and only mutated through
/// [`diff`](crate::differ::diff).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, Entry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Owned copies of every entry, sorted by name
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.values().cloned().collect()
    }

    /// Insert an entry, returning the entry it replaced
    pub(crate) fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.name().to_string(), entry)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
