//! Configuration module for dirtrack
//!
//! Configuration can be loaded from a TOML file and/or `DIRTRACK_*`
//! environment variables. Everything has a default, so an absent file
//! yields a usable configuration.

mod defaults;
mod loading;


use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.dirtrack/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".dirtrack").join("config.toml"))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory tracker configuration
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Policy deciding whether an entry present in two consecutive scans changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModificationPolicy {
    /// Modified iff the modification timestamps differ (default)
    #[default]
    Mtime,
    /// Modified iff the modification timestamps or the sizes differ
    MtimeOrSize,
    /// Never report an existing entry as modified
    Never,
}

/// Configuration for a directory tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Glob patterns matched against entry names; matching entries are not tracked
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// When non-empty, only entry names matching one of these globs are tracked
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Track entries whose name starts with '.'
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,

    /// Stat symlink targets instead of the links themselves
    #[serde(default)]
    pub follow_symlinks: bool,

    /// How an existing entry is judged modified between scans
    #[serde(default)]
    pub modification_policy: ModificationPolicy,

    /// Capacity of the channel carrying raw change signals into a session
    #[serde(default = "default_signal_queue_size")]
    pub signal_queue_size: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
            include_patterns: Vec::new(),
            include_hidden: default_include_hidden(),
            follow_symlinks: false,
            modification_policy: ModificationPolicy::default(),
            signal_queue_size: default_signal_queue_size(),
        }
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let tracker = &self.tracker;

        if tracker.signal_queue_size == 0 {
            return Err(Error::config(
                "tracker.signal_queue_size must be greater than 0".to_string(),
            ));
        }

        for pattern in tracker
            .ignore_patterns
            .iter()
            .chain(tracker.include_patterns.iter())
        {
            glob::Pattern::new(pattern).map_err(|e| {
                Error::config(format!("Invalid glob pattern '{pattern}': {e}"))
            })?;
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }
}
