//! Entry inclusion filtering
//!
//! Glob-based filtering of raw directory entries by name. By default the
//! filter accepts everything; ignore patterns, include patterns and the
//! hidden-file policy narrow it down.

use crate::entry::{EntryKind, RawEntry};
use dirtrack_core::{Error, Result, TrackerConfig};
use glob::Pattern;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// Decides which listed entries are tracked
#[derive(Debug, Clone)]
pub struct EntryFilter {
    /// Names matching any of these are dropped
    ignore: Arc<Vec<Pattern>>,
    /// When non-empty, only names matching one of these are kept
    include: Arc<Vec<Pattern>>,
    /// Entry kinds that are never tracked
    excluded_kinds: Arc<HashSet<EntryKind>>,
    include_hidden: bool,
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl EntryFilter {
    /// A filter that keeps every entry
    pub fn accept_all() -> Self {
        Self {
            ignore: Arc::new(Vec::new()),
            include: Arc::new(Vec::new()),
            excluded_kinds: Arc::new(HashSet::new()),
            include_hidden: true,
        }
    }

    /// Create with builder pattern
    pub fn builder() -> EntryFilterBuilder {
        EntryFilterBuilder::default()
    }

    /// Build the filter described by a tracker configuration
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        Self::builder()
            .ignore_patterns(config.ignore_patterns.clone())
            .include_patterns(config.include_patterns.clone())
            .include_hidden(config.include_hidden)
            .build()
    }

    /// Check whether an entry should be tracked
    pub fn accepts(&self, entry: &RawEntry) -> bool {
        if !self.include_hidden && entry.is_hidden() {
            trace!("Skipping hidden entry: {}", entry.name);
            return false;
        }

        if self.excluded_kinds.contains(&entry.kind) {
            trace!("Skipping {:?} entry: {}", entry.kind, entry.name);
            return false;
        }

        if self.ignore.iter().any(|p| p.matches(&entry.name)) {
            trace!("Entry {} matches ignore pattern", entry.name);
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|p| p.matches(&entry.name))
    }
}

/// Builder for EntryFilter
pub struct EntryFilterBuilder {
    ignore: Vec<String>,
    include: Vec<String>,
    excluded_kinds: HashSet<EntryKind>,
    include_hidden: bool,
}

impl Default for EntryFilterBuilder {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            include: Vec::new(),
            excluded_kinds: HashSet::new(),
            include_hidden: true,
        }
    }
}

impl EntryFilterBuilder {
    /// Add a glob pattern to ignore
    pub fn add_ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ignore.push(pattern.into());
        self
    }

    /// Add multiple ignore patterns
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore.extend(patterns);
        self
    }

    /// Add a glob pattern an entry must match to be tracked
    pub fn add_include_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    /// Add multiple include patterns
    pub fn include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include.extend(patterns);
        self
    }

    /// Never track entries of this kind
    pub fn exclude_kind(mut self, kind: EntryKind) -> Self {
        self.excluded_kinds.insert(kind);
        self
    }

    /// Set whether dot-files are tracked
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Build the filter
    pub fn build(self) -> Result<EntryFilter> {
        Ok(EntryFilter {
            ignore: Arc::new(compile(&self.ignore)?),
            include: Arc::new(compile(&self.include)?),
            excluded_kinds: Arc::new(self.excluded_kinds),
            include_hidden: self.include_hidden,
        })
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| Error::invalid_input(format!("Invalid glob pattern '{p}': {e}")))
        })
        .collect()
}
