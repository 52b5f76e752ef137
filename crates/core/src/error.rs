use std::path::PathBuf;
use thiserror::Error;

/// Result type for dirtrack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dirtrack operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The watched directory could not be listed
    #[error("Failed to list directory {}: {source}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entry could not be stat'ed after it was listed
    #[error("Failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS-level watch could not be established
    #[error("Watch registration error: {0}")]
    WatchRegistration(String),

    /// The OS-level watch failed after it was established
    #[error("Watch runtime error: {0}")]
    WatchRuntime(String),

    /// A previous session of this tracker failed; the tracker does not reopen
    #[error("Tracking session failed: {0}")]
    SessionFailed(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a listing error for `path`
    pub fn listing(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Listing {
            path: path.into(),
            source,
        }
    }

    /// Creates a stat error for `path`
    pub fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }

    /// Creates a watch registration error
    pub fn watch_registration(msg: impl Into<String>) -> Self {
        Self::WatchRegistration(msg.into())
    }

    /// Creates a watch runtime error
    pub fn watch_runtime(msg: impl Into<String>) -> Self {
        Self::WatchRuntime(msg.into())
    }

    /// Creates a session failure error
    pub fn session_failed(msg: impl Into<String>) -> Self {
        Self::SessionFailed(msg.into())
    }

    /// Creates an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_listing_error_mentions_path() {
        let err = Error::listing(
            "/tmp/missing",
            std::io::Error::new(ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing"));
        assert!(msg.contains("gone"));
        assert!(matches!(err, Error::Listing { .. }));
    }

    #[test]
    fn test_result_ext_context() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "denied"));
        let err = res.context("Reading config").unwrap_err();
        assert_eq!(err.to_string(), "Reading config: denied");
    }
}
