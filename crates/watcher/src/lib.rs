#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Incremental directory change tracking
//!
//! This crate keeps an in-memory snapshot of one directory's direct
//! children and turns OS change notifications into deltas:
//! - One OS-level watch and one scan pipeline per directory, shared by all subscribers
//! - Generation-based debouncing: stale scans are discarded, never emitted
//! - Catch-up deltas for late subscribers, with a per-subscriber replica
//! - Pluggable inclusion filter and modification check
//!
//! # Example
//!
//! ```no_run
//! use dirtrack_watcher::{track_directory, TrackOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = track_directory("/path/to/dir", TrackOptions::default());
//! let mut subscription = tracker.subscribe().await?;
//!
//! while let Some(delta) = subscription.recv().await {
//!     for name in delta.added_names() {
//!         println!("+ {name}");
//!     }
//!     for name in delta.removed_names() {
//!         println!("- {name}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod debouncer;
mod differ;
mod entry;
mod filter;
mod loader;
mod notifier;
mod options;
mod replica;
mod session;
mod snapshot;
mod tracker;

pub use debouncer::{Completion, Debouncer, Generation};
pub use differ::{diff, mtime_differs};
pub use entry::{Delta, Entry, EntryKind, EntryMetadata, RawEntry};
pub use filter::{EntryFilter, EntryFilterBuilder};
pub use loader::{EntrySource, FsSource, Loader};
pub use notifier::{
    is_change, signal_channel, ChangeNotifier, NotifyBackend, Signal, SignalReceiver, SignalSink,
    WatchHandle,
};
pub use options::{modification_check, FilterFn, ModifiedFn, TrackOptions, DEFAULT_SIGNAL_QUEUE_SIZE};
pub use replica::Replica;
pub use session::{CloseReason, SessionState};
pub use snapshot::Snapshot;
pub use tracker::{track_directory, DirectoryTracker, Subscription};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::entry::{Delta, Entry};
    pub use crate::options::TrackOptions;
    pub use crate::tracker::{track_directory, DirectoryTracker, Subscription};
}
