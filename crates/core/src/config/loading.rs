//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;
use tracing::debug;

use super::defaults::*;
use super::{global_config_path, Config};

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `DIRTRACK_` and use double underscores
    /// for nested values. For example:
    /// - `DIRTRACK_TRACKER__FOLLOW_SYMLINKS=true`
    /// - `DIRTRACK_TRACKER__MODIFICATION_POLICY=mtime_or_size`
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        // The config crate does not apply serde defaults to scalar fields overridden from env
        let builder = set_config_default(
            builder,
            "tracker.signal_queue_size",
            default_signal_queue_size() as i64,
        )?;
        let builder =
            set_config_default(builder, "tracker.include_hidden", default_include_hidden())?;
        let builder = set_config_default(builder, "tracker.follow_symlinks", false)?;
        let mut builder = set_config_default(builder, "tracker.modification_policy", "mtime")?;

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("DIRTRACK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from a single file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.dirtrack/config.toml or custom --config path)
    /// 3. Environment variables (DIRTRACK_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        debug!("Loading configuration from {:?}", path);
        let config = Self::from_file(&path)?;
        config.validate()?;
        Ok(config)
    }
}
