//! Snapshot diffing
//!
//! Compares a complete, freshly loaded listing against the previous
//! [`Snapshot`], updates the snapshot in place and returns the minimal
//! [`Delta`] between the two states.

use crate::entry::{Delta, Entry};
use crate::snapshot::Snapshot;
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

/// Default modification check: strict inequality of modification times
///
/// Two writes within the same timestamp quantum are not reported.
pub fn mtime_differs(new: &Entry, old: &Entry) -> bool {
    new.metadata().modified != old.metadata().modified
}

/// Apply a loaded listing to `snapshot` and return what changed
///
/// `loaded` must be the complete result of one scan; a partial listing
/// would be reported as deletions. If the same name occurs more than once
/// the last occurrence wins. The result does not depend on the order of
/// `loaded`.
pub fn diff(
    snapshot: &mut Snapshot,
    loaded: Vec<Entry>,
    is_modified: &(dyn Fn(&Entry, &Entry) -> bool + Send + Sync),
) -> Delta {
    let loaded: BTreeMap<String, Entry> = loaded
        .into_iter()
        .map(|entry| (entry.name().to_string(), entry))
        .collect();

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut present = HashSet::with_capacity(loaded.len());

    for (name, entry) in loaded {
        let modified = snapshot.get(&name).map(|old| is_modified(&entry, old));

        match modified {
            None => {
                trace!("Added entry: {}", name);
                snapshot.insert(entry.clone());
                added.push(entry);
            }
            Some(true) => {
                trace!("Modified entry: {}", name);
                if let Some(old) = snapshot.insert(entry.clone()) {
                    removed.push(old);
                }
                added.push(entry);
            }
            Some(false) => {}
        }

        present.insert(name);
    }

    let gone: Vec<String> = snapshot
        .iter()
        .map(|entry| entry.name())
        .filter(|name| !present.contains(*name))
        .map(str::to_string)
        .collect();

    for name in gone {
        trace!("Removed entry: {}", name);
        if let Some(old) = snapshot.remove(&name) {
            removed.push(old);
        }
    }

    Delta::new(added, removed)
}
