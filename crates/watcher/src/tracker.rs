//! Directory tracker and subscriptions
//!
//! A [`DirectoryTracker`] shares one watch session between any number of
//! [`Subscription`]s. The session is started by the first subscribe and
//! closed when the last subscription goes away.

use crate::entry::Delta;
use crate::loader::{EntrySource, FsSource};
use crate::notifier::{ChangeNotifier, NotifyBackend};
use crate::options::TrackOptions;
use crate::replica::Replica;
use crate::session::{CloseReason, SessionHandle, SessionState, Subscriber, WatchSession};
use dirtrack_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Track a directory with the platform watcher and the real filesystem
pub fn track_directory(path: impl Into<PathBuf>, options: TrackOptions) -> DirectoryTracker {
    DirectoryTracker::new(path, options)
}

#[derive(Default)]
struct TrackerInner {
    session: Option<SessionHandle>,
    /// Set once a session fails; the tracker never starts another
    failure: Option<String>,
}

/// Shares one watch session of a directory between subscribers
pub struct DirectoryTracker {
    path: PathBuf,
    options: TrackOptions,
    notifier: Arc<dyn ChangeNotifier>,
    source: Arc<dyn EntrySource>,
    inner: Mutex<TrackerInner>,
    next_id: AtomicU64,
}

impl DirectoryTracker {
    pub fn new(path: impl Into<PathBuf>, options: TrackOptions) -> Self {
        Self::with_backends(
            path,
            options,
            Arc::new(NotifyBackend::new()),
            Arc::new(FsSource),
        )
    }

    /// Create a tracker with explicit notification and listing backends
    pub fn with_backends(
        path: impl Into<PathBuf>,
        options: TrackOptions,
        notifier: Arc<dyn ChangeNotifier>,
        source: Arc<dyn EntrySource>,
    ) -> Self {
        Self {
            path: path.into(),
            options,
            notifier,
            source,
            inner: Mutex::new(TrackerInner::default()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &TrackOptions {
        &self.options
    }

    /// Attach a new subscriber, starting the watch session if needed
    ///
    /// Returns once the session has applied its initial scan. The first
    /// delta the subscription yields brings its replica up to date: the
    /// initial delta for a fresh session, a catch-up delta otherwise.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let mut inner = self.inner.lock().await;
        if let Some(message) = &inner.failure {
            return Err(Error::session_failed(message.clone()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let mut attached = None;
        if let Some(handle) = inner.session.clone() {
            if !handle.state().is_closed() {
                match handle
                    .attach(Subscriber::new(id, tx.clone(), token.clone()))
                    .await
                {
                    Ok(()) => attached = Some(handle),
                    Err(e) => debug!("Session of {:?} closed during attach: {}", self.path, e),
                }
            }
        }

        let handle = match attached {
            Some(handle) => handle,
            None => {
                if let Some(message) = inner.take_failure() {
                    return Err(Error::session_failed(message));
                }
                debug!("Starting watch session for {:?}", self.path);
                let handle = WatchSession::start(
                    &self.path,
                    &self.options,
                    self.notifier.as_ref(),
                    Arc::clone(&self.source),
                    Subscriber::new(id, tx, token.clone()),
                )?;
                inner.session = Some(handle.clone());
                handle
            }
        };
        drop(inner);

        match handle.started().await {
            SessionState::Watching => Ok(Subscription::new(rx, token)),
            SessionState::Closed(CloseReason::Failed(message)) => {
                self.inner.lock().await.failure = Some(message.clone());
                Err(Error::session_failed(message))
            }
            state => Err(Error::session_failed(format!(
                "session ended before it started ({state:?})"
            ))),
        }
    }

    /// Close the live session, if any
    ///
    /// Attached subscriptions end. A later subscribe starts a new session.
    /// A session that had already failed keeps reporting its failure.
    pub async fn close(&self) {
        let session = self.inner.lock().await.session.clone();
        if let Some(handle) = session {
            if !handle.state().is_closed() {
                info!("Closing watch session for {:?}", self.path);
            }
            handle.close();
            handle.closed().await;
        }
    }

    /// State of the most recent session; `None` before the first subscribe
    ///
    /// Not held up by a subscribe waiting for its initial scan.
    pub async fn state(&self) -> Option<SessionState> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(SessionHandle::state)
    }
}

impl TrackerInner {
    /// Record the failure of the previous session, if it failed
    fn take_failure(&mut self) -> Option<String> {
        if let Some(SessionState::Closed(CloseReason::Failed(message))) =
            self.session.as_ref().map(SessionHandle::state)
        {
            self.failure = Some(message.clone());
            return Some(message);
        }
        None
    }
}

impl std::fmt::Debug for DirectoryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryTracker")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish()
    }
}

/// One subscriber's view of a tracked directory
///
/// Dropping the subscription detaches it.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Delta>,
    token: CancellationToken,
    replica: Replica,
}

impl Subscription {
    fn new(rx: mpsc::UnboundedReceiver<Delta>, token: CancellationToken) -> Self {
        Self {
            rx,
            token,
            replica: Replica::new(),
        }
    }

    /// Receive the next delta and apply it to the replica
    ///
    /// Returns `None` once the subscription is cancelled or the session has
    /// closed. Deltas still queued at cancellation are never returned.
    pub async fn recv(&mut self) -> Option<Delta> {
        if self.token.is_cancelled() {
            return None;
        }

        let delta = tokio::select! {
            biased;
            _ = self.token.cancelled() => return None,
            delta = self.rx.recv() => delta?,
        };

        self.replica.apply(&delta);
        Some(delta)
    }

    /// Entries this subscriber has observed so far
    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Detach from the session
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.token.is_cancelled())
            .field("replica_len", &self.replica.len())
            .finish()
    }
}
