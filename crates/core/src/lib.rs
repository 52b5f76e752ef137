//! Core types for the dirtrack directory tracker
//!
//! This crate provides the foundational pieces shared by the tracker and
//! the command line tool:
//!
//! - **Configuration**: file and environment driven tracker settings
//! - **Error handling**: unified error types
//!

pub mod config;
pub mod error;

// Re-export main types for convenience
pub use config::{Config, ModificationPolicy, TrackerConfig};
pub use error::{Error, Result, ResultExt};
