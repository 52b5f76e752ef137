//! Directory scanning
//!
//! One scan lists the watched directory, filters the listing and stats
//! every surviving entry. The scan either yields the complete list or
//! fails; it never touches the snapshot.

use crate::entry::{Entry, EntryKind, EntryMetadata, RawEntry};
use crate::options::FilterFn;
use async_trait::async_trait;
use dirtrack_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Directory listing and stat primitives
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// List the direct children of `dir`
    async fn list(&self, dir: &Path) -> Result<Vec<RawEntry>>;

    /// Stat a single path
    async fn stat(&self, path: &Path, follow_symlinks: bool) -> Result<EntryMetadata>;
}

/// [`EntrySource`] backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

#[async_trait]
impl EntrySource for FsSource {
    async fn list(&self, dir: &Path) -> Result<Vec<RawEntry>> {
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| Error::listing(dir, e))?;

        let mut entries = Vec::new();
        while let Some(dir_entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| Error::listing(dir, e))?
        {
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            let kind = dir_entry
                .file_type()
                .await
                .map(EntryKind::from)
                .map_err(|e| Error::stat(dir_entry.path(), e))?;
            entries.push(RawEntry::new(name, kind));
        }

        Ok(entries)
    }

    async fn stat(&self, path: &Path, follow_symlinks: bool) -> Result<EntryMetadata> {
        let metadata = if follow_symlinks {
            tokio::fs::metadata(path).await
        } else {
            tokio::fs::symlink_metadata(path).await
        }
        .map_err(|e| Error::stat(path, e))?;

        Ok(EntryMetadata::from_std(&metadata))
    }
}

/// Performs scans of one directory
pub struct Loader {
    dir: PathBuf,
    source: Arc<dyn EntrySource>,
    filter: FilterFn,
    follow_symlinks: bool,
}

impl Loader {
    pub fn new(
        dir: impl Into<PathBuf>,
        source: Arc<dyn EntrySource>,
        filter: FilterFn,
        follow_symlinks: bool,
    ) -> Self {
        Self {
            dir: dir.into(),
            source,
            filter,
            follow_symlinks,
        }
    }

    /// Run one scan
    ///
    /// Fails on the first listing or stat error; no partial result is
    /// returned.
    pub async fn load(&self) -> Result<Vec<Entry>> {
        let listing = self.source.list(&self.dir).await?;
        let listed = listing.len();

        let mut entries = Vec::with_capacity(listed);
        for raw in listing {
            if !(self.filter)(&raw) {
                trace!("Filtered out entry: {}", raw.name);
                continue;
            }

            let metadata = self
                .source
                .stat(&self.dir.join(&raw.name), self.follow_symlinks)
                .await?;
            entries.push(Entry::new(raw.name, metadata));
        }

        debug!(
            "Scanned {:?}: {} listed, {} tracked",
            self.dir,
            listed,
            entries.len()
        );
        Ok(entries)
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("dir", &self.dir)
            .field("follow_symlinks", &self.follow_symlinks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn accept_all() -> FilterFn {
        Arc::new(|_: &RawEntry| true)
    }

    /// In-memory source whose stat can be made to fail for chosen names
    struct FakeSource {
        names: Vec<String>,
        failing: HashSet<String>,
    }

    #[async_trait]
    impl EntrySource for FakeSource {
        async fn list(&self, _dir: &Path) -> Result<Vec<RawEntry>> {
            Ok(self
                .names
                .iter()
                .map(|n| RawEntry::new(n.clone(), EntryKind::File))
                .collect())
        }

        async fn stat(&self, path: &Path, _follow_symlinks: bool) -> Result<EntryMetadata> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.failing.contains(&name) {
                return Err(Error::stat(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "vanished"),
                ));
            }
            Ok(EntryMetadata::new(SystemTime::UNIX_EPOCH, 0, EntryKind::File))
        }
    }

    #[tokio::test]
    async fn test_load_real_directory() {
        let temp_dir = TempDir::new().expect("test setup failed");
        std::fs::write(temp_dir.path().join("a.txt"), b"a").expect("test setup failed");
        std::fs::write(temp_dir.path().join("b.txt"), b"bb").expect("test setup failed");
        std::fs::create_dir(temp_dir.path().join("sub")).expect("test setup failed");

        let loader = Loader::new(temp_dir.path(), Arc::new(FsSource), accept_all(), false);
        let mut entries = loader.load().await.expect("scan failed");
        entries.sort_by(|a, b| a.name().cmp(b.name()));

        let names: Vec<_> = entries.iter().map(Entry::name).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert_eq!(entries[1].metadata().size, 2);
        assert_eq!(entries[2].metadata().kind, EntryKind::Directory);
    }

    #[tokio::test]
    async fn test_filter_is_applied_before_stat() {
        let source = FakeSource {
            names: vec!["keep".to_string(), "skip".to_string()],
            failing: HashSet::from(["skip".to_string()]),
        };
        let filter: FilterFn = Arc::new(|raw: &RawEntry| raw.name != "skip");

        let loader = Loader::new("/virtual", Arc::new(source), filter, false);
        let entries = loader.load().await.expect("filtered entry must not be stat'ed");

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "keep");
    }

    #[tokio::test]
    async fn test_stat_failure_aborts_scan() {
        let source = FakeSource {
            names: vec!["a".to_string(), "gone".to_string()],
            failing: HashSet::from(["gone".to_string()]),
        };

        let loader = Loader::new("/virtual", Arc::new(source), accept_all(), false);
        let err = loader.load().await.expect_err("scan should fail");
        assert!(matches!(err, Error::Stat { .. }));
    }

    #[tokio::test]
    async fn test_missing_directory_is_listing_error() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let missing = temp_dir.path().join("missing");

        let loader = Loader::new(&missing, Arc::new(FsSource), accept_all(), false);
        let err = loader.load().await.expect_err("scan should fail");
        assert!(matches!(err, Error::Listing { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_not_followed_by_default() {
        let temp_dir = TempDir::new().expect("test setup failed");
        std::fs::write(temp_dir.path().join("target.txt"), b"data").expect("test setup failed");
        std::os::unix::fs::symlink(
            temp_dir.path().join("target.txt"),
            temp_dir.path().join("link"),
        )
        .expect("test setup failed");

        let filter: FilterFn = Arc::new(|raw: &RawEntry| raw.name == "link");

        let loader = Loader::new(temp_dir.path(), Arc::new(FsSource), filter.clone(), false);
        let entries = loader.load().await.expect("scan failed");
        assert_eq!(entries[0].metadata().kind, EntryKind::Symlink);

        let loader = Loader::new(temp_dir.path(), Arc::new(FsSource), filter, true);
        let entries = loader.load().await.expect("scan failed");
        assert_eq!(entries[0].metadata().kind, EntryKind::File);
        assert_eq!(entries[0].metadata().size, 4);
    }
}
