//! Entry, metadata and delta types
//!
//! Everything here is immutable once constructed. A changed directory entry
//! is represented by a new [`Entry`], never by mutating an existing one.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Kind of a directory entry as reported by the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl From<std::fs::FileType> for EntryKind {
    fn from(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// A directory entry as listed, before it is stat'ed
///
/// This is what the inclusion filter sees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawEntry {
    /// Name relative to the watched directory
    pub name: String,
    /// Kind reported by the listing
    pub kind: EntryKind,
}

impl RawEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Whether the name starts with a dot
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Immutable entry metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Last modified time
    pub modified: SystemTime,
    /// Size in bytes
    pub size: u64,
    /// Entry kind as stat'ed
    pub kind: EntryKind,
    /// Whether the entry is read-only
    pub readonly: bool,
}

impl EntryMetadata {
    /// Create new entry metadata
    pub fn new(modified: SystemTime, size: u64, kind: EntryKind) -> Self {
        Self {
            modified,
            size,
            kind,
            readonly: false,
        }
    }

    /// Build metadata from a stat result
    ///
    /// Platforms without modification times report `UNIX_EPOCH`, which
    /// makes the default modification check treat the entry as unchanged.
    pub fn from_std(metadata: &std::fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
            kind: EntryKind::from(metadata.file_type()),
            readonly: metadata.permissions().readonly(),
        }
    }
}

/// A tracked entry: a name plus the metadata snapshot taken when it was scanned
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    name: String,
    metadata: EntryMetadata,
}

impl Entry {
    pub fn new(name: impl Into<String>, metadata: EntryMetadata) -> Self {
        Self {
            name: name.into(),
            metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }
}

/// Transition between two consecutive snapshots
///
/// `removed` entries were present immediately before the delta, `added`
/// entries are present immediately after. A modified entry shows up as
/// its old version in `removed` and its new version in `added`. Both lists
/// are sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    added: Vec<Entry>,
    removed: Vec<Entry>,
}

impl Delta {
    pub fn new(mut added: Vec<Entry>, mut removed: Vec<Entry>) -> Self {
        added.sort_by(|a, b| a.name.cmp(&b.name));
        removed.sort_by(|a, b| a.name.cmp(&b.name));
        Self { added, removed }
    }

    /// Delta bringing an empty replica up to `entries`
    pub fn catch_up(entries: Vec<Entry>) -> Self {
        Self::new(entries, Vec::new())
    }

    pub fn added(&self) -> &[Entry] {
        &self.added
    }

    pub fn removed(&self) -> &[Entry] {
        &self.removed
    }

    /// True when neither set has entries
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn added_names(&self) -> impl Iterator<Item = &str> {
        self.added.iter().map(Entry::name)
    }

    pub fn removed_names(&self) -> impl Iterator<Item = &str> {
        self.removed.iter().map(Entry::name)
    }
}
