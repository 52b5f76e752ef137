//! Per-subscriber view of the directory
//!
//! A replica starts empty and is kept in sync purely by applying the
//! deltas its subscription receives.

use crate::entry::{Delta, Entry};
use std::collections::BTreeMap;

/// Entries a subscriber currently believes are present, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replica {
    entries: BTreeMap<String, Entry>,
}

impl Replica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a delta: removals first, then additions
    ///
    /// A modified entry appears in both lists, so applying removals first
    /// leaves the new version in place.
    pub fn apply(&mut self, delta: &Delta) {
        for entry in delta.removed() {
            self.entries.remove(entry.name());
        }
        for entry in delta.added() {
            self.entries
                .insert(entry.name().to_string(), entry.clone());
        }
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

    /// Entries sorted by name
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Names sorted
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
