//! Options for a directory tracker
//!
//! [`TrackOptions`] carries the two policies the tracker is parameterised
//! by (the inclusion filter and the modification check) plus a couple of
//! plumbing knobs. Options can be assembled in code or derived from a
//! [`TrackerConfig`].

use crate::differ::mtime_differs;
use crate::entry::{Entry, RawEntry};
use crate::filter::EntryFilter;
use dirtrack_core::{Error, ModificationPolicy, Result, TrackerConfig};
use std::sync::Arc;

/// Inclusion predicate applied to listed entries
pub type FilterFn = Arc<dyn Fn(&RawEntry) -> bool + Send + Sync>;

/// Modification predicate, called as `is_modified(new, old)`
pub type ModifiedFn = Arc<dyn Fn(&Entry, &Entry) -> bool + Send + Sync>;

/// Default capacity of the raw signal channel
pub const DEFAULT_SIGNAL_QUEUE_SIZE: usize = 1024;

/// Immutable options for a directory tracker
#[derive(Clone)]
pub struct TrackOptions {
    /// Which listed entries are tracked (default: all)
    pub filter: FilterFn,
    /// Whether an entry seen in two scans changed (default: mtime inequality)
    pub is_modified: ModifiedFn,
    /// Stat symlink targets instead of the links themselves
    pub follow_symlinks: bool,
    /// Capacity of the raw signal channel
    pub signal_queue_size: usize,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            filter: Arc::new(|_: &RawEntry| true),
            is_modified: Arc::new(mtime_differs),
            follow_symlinks: false,
            signal_queue_size: DEFAULT_SIGNAL_QUEUE_SIZE,
        }
    }
}

impl std::fmt::Debug for TrackOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackOptions")
            .field("filter", &"<fn>")
            .field("is_modified", &"<fn>")
            .field("follow_symlinks", &self.follow_symlinks)
            .field("signal_queue_size", &self.signal_queue_size)
            .finish()
    }
}

impl TrackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive options from a tracker configuration
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        if config.signal_queue_size == 0 {
            return Err(Error::config(
                "signal_queue_size must be greater than 0".to_string(),
            ));
        }

        let entry_filter = EntryFilter::from_config(config)?;

        Ok(Self {
            filter: Arc::new(move |raw: &RawEntry| entry_filter.accepts(raw)),
            is_modified: modification_check(config.modification_policy),
            follow_symlinks: config.follow_symlinks,
            signal_queue_size: config.signal_queue_size,
        })
    }

    /// Replace the inclusion filter
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&RawEntry) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(filter);
        self
    }

    /// Replace the inclusion filter with a glob-based [`EntryFilter`]
    pub fn with_entry_filter(self, entry_filter: EntryFilter) -> Self {
        self.with_filter(move |raw: &RawEntry| entry_filter.accepts(raw))
    }

    /// Replace the modification check
    pub fn with_is_modified<F>(mut self, is_modified: F) -> Self
    where
        F: Fn(&Entry, &Entry) -> bool + Send + Sync + 'static,
    {
        self.is_modified = Arc::new(is_modified);
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn signal_queue_size(mut self, size: usize) -> Self {
        self.signal_queue_size = size.max(1);
        self
    }
}

/// Modification check implementing a configured policy
pub fn modification_check(policy: ModificationPolicy) -> ModifiedFn {
    match policy {
        ModificationPolicy::Mtime => Arc::new(mtime_differs),
        ModificationPolicy::MtimeOrSize => Arc::new(|new: &Entry, old: &Entry| {
            mtime_differs(new, old) || new.metadata().size != old.metadata().size
        }),
        ModificationPolicy::Never => Arc::new(|_: &Entry, _: &Entry| false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryKind, EntryMetadata};
    use std::time::{Duration, SystemTime};

    fn entry(secs: u64, size: u64) -> Entry {
        Entry::new(
            "a",
            EntryMetadata::new(
                SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
                size,
                EntryKind::File,
            ),
        )
    }

    #[test]
    fn test_defaults() {
        let options = TrackOptions::default();
        assert!((options.filter)(&RawEntry::new(".anything", EntryKind::Other)));
        assert!((options.is_modified)(&entry(2, 0), &entry(1, 0)));
        assert!(!(options.is_modified)(&entry(1, 0), &entry(1, 9)));
        assert!(!options.follow_symlinks);
    }

    #[test]
    fn test_policies() {
        let mtime_or_size = modification_check(ModificationPolicy::MtimeOrSize);
        assert!(mtime_or_size(&entry(1, 2), &entry(1, 1)));
        assert!(!mtime_or_size(&entry(1, 1), &entry(1, 1)));

        let never = modification_check(ModificationPolicy::Never);
        assert!(!never(&entry(5, 5), &entry(1, 1)));
    }

    #[test]
    fn test_from_config() {
        let config = TrackerConfig {
            include_patterns: vec!["*.md".to_string()],
            modification_policy: ModificationPolicy::Never,
            follow_symlinks: true,
            ..TrackerConfig::default()
        };

        let options = TrackOptions::from_config(&config).expect("test setup failed");
        assert!((options.filter)(&RawEntry::new("README.md", EntryKind::File)));
        assert!(!(options.filter)(&RawEntry::new("main.rs", EntryKind::File)));
        assert!(!(options.is_modified)(&entry(2, 0), &entry(1, 0)));
        assert!(options.follow_symlinks);
    }

    #[test]
    fn test_from_config_rejects_zero_queue() {
        let config = TrackerConfig {
            signal_queue_size: 0,
            ..TrackerConfig::default()
        };
        assert!(TrackOptions::from_config(&config).is_err());
    }
}
