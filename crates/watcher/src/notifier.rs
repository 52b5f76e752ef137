//! OS-level change notification
//!
//! Wraps the notify crate behind [`ChangeNotifier`]. The notifier only
//! reports that *something* changed; the session re-scans to find out what.

use dirtrack_core::{Error, Result};
use notify::{
    Config as NotifyConfig, Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode,
    Watcher as NotifyWatcher,
};
use std::path::Path;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, trace};

/// Raw signal forwarded from a watch handle to its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// The directory may have changed
    Changed,
    /// The watch failed after it was established
    Failed(String),
}

/// Create the signal path from a watch handle into its session
///
/// Change signals go through a bounded queue of `capacity`. Failures go
/// through a separate unbounded queue so they are never dropped.
pub fn signal_channel(capacity: usize) -> (SignalSink, SignalReceiver) {
    let (changes_tx, changes_rx) = mpsc::channel(capacity.max(1));
    let (failures_tx, failures_rx) = mpsc::unbounded_channel();
    (
        SignalSink {
            changes: changes_tx,
            failures: failures_tx,
        },
        SignalReceiver {
            changes: changes_rx,
            failures: failures_rx,
        },
    )
}

/// Sending half of a session's signal path
///
/// Safe to call from the notify backend's own thread.
#[derive(Debug, Clone)]
pub struct SignalSink {
    changes: mpsc::Sender<()>,
    failures: mpsc::UnboundedSender<String>,
}

impl SignalSink {
    /// Report a possible change
    ///
    /// A full queue already holds an undelivered signal that guarantees a
    /// re-scan, so the signal is dropped.
    pub fn changed(&self) {
        match self.changes.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("Signal queue full, dropping change signal"),
            Err(TrySendError::Closed(_)) => trace!("Session gone, dropping change signal"),
        }
    }

    /// Report a watch failure
    pub fn failed(&self, message: impl Into<String>) {
        let message = message.into();
        if self.failures.send(message.clone()).is_err() {
            debug!("Session gone, dropping watch failure '{}'", message);
        }
    }
}

/// Receiving half of a session's signal path
#[derive(Debug)]
pub struct SignalReceiver {
    changes: mpsc::Receiver<()>,
    failures: mpsc::UnboundedReceiver<String>,
}

impl SignalReceiver {
    /// Next signal; failures take precedence over queued changes
    ///
    /// Returns `None` once every sink is gone. Cancel safe.
    pub async fn recv(&mut self) -> Option<Signal> {
        tokio::select! {
            biased;
            Some(message) = self.failures.recv() => Some(Signal::Failed(message)),
            changed = self.changes.recv() => changed.map(|()| Signal::Changed),
        }
    }
}

/// An active OS-level watch; dropping it releases the watch
pub trait WatchHandle: Send {}

/// Registers OS-level watches
pub trait ChangeNotifier: Send + Sync {
    /// Start watching `dir` (non-recursively), forwarding signals to `sink`
    fn watch(&self, dir: &Path, sink: SignalSink) -> Result<Box<dyn WatchHandle>>;
}

/// [`ChangeNotifier`] backed by notify's recommended platform watcher
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyBackend;

impl NotifyBackend {
    pub fn new() -> Self {
        Self
    }
}

struct NotifyHandle {
    _watcher: RecommendedWatcher,
}

impl WatchHandle for NotifyHandle {}

impl ChangeNotifier for NotifyBackend {
    fn watch(&self, dir: &Path, sink: SignalSink) -> Result<Box<dyn WatchHandle>> {
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<NotifyEvent, notify::Error>| match res {
                Ok(event) => {
                    trace!("Received notify event: {:?}", event);
                    if is_change(&event.kind) {
                        sink.changed();
                    }
                }
                Err(e) => {
                    error!("Notify error: {}", e);
                    sink.failed(e.to_string());
                }
            },
            NotifyConfig::default(),
        )
        .map_err(|e| Error::watch_registration(format!("Failed to create watcher: {e}")))?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::watch_registration(format!("Failed to watch path {dir:?}: {e}")))?;

        info!("Watching directory: {:?}", dir);
        Ok(Box::new(NotifyHandle { _watcher: watcher }))
    }
}

/// Whether an event kind can reflect a change in the directory listing
///
/// Access events are excluded: scanning opens and reads the directory,
/// so forwarding them would make every scan schedule another one.
pub fn is_change(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};
    use tempfile::TempDir;

    #[test]
    fn test_access_events_are_not_changes() {
        assert!(!is_change(&EventKind::Access(AccessKind::Any)));
        assert!(is_change(&EventKind::Create(CreateKind::File)));
        assert!(is_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_change(&EventKind::Remove(RemoveKind::File)));
        assert!(is_change(&EventKind::Any));
    }

    #[tokio::test]
    async fn test_sink_drops_changes_when_full() {
        let (sink, mut signals) = signal_channel(1);

        sink.changed();
        sink.changed();
        sink.changed();

        assert_eq!(signals.recv().await, Some(Signal::Changed));
        let mut next = tokio_test::task::spawn(signals.recv());
        tokio_test::assert_pending!(next.poll());
    }

    #[tokio::test]
    async fn test_failure_survives_full_queue() {
        let (sink, mut signals) = signal_channel(1);

        sink.changed();
        sink.changed();
        sink.failed("watch broke");

        assert_eq!(
            signals.recv().await,
            Some(Signal::Failed("watch broke".to_string()))
        );
        assert_eq!(signals.recv().await, Some(Signal::Changed));
    }

    #[tokio::test]
    async fn test_receiver_ends_when_sinks_dropped() {
        let (sink, mut signals) = signal_channel(4);
        sink.changed();
        drop(sink);

        assert_eq!(signals.recv().await, Some(Signal::Changed));
        assert_eq!(signals.recv().await, None);
    }

    #[tokio::test]
    async fn test_watch_missing_directory_fails() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let (sink, _signals) = signal_channel(8);

        let result = NotifyBackend::new().watch(&temp_dir.path().join("missing"), sink);
        assert!(matches!(result, Err(Error::WatchRegistration(_))));
    }

    #[tokio::test]
    async fn test_watch_reports_creation() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let (sink, mut signals) = signal_channel(8);

        let _handle = NotifyBackend::new()
            .watch(temp_dir.path(), sink)
            .expect("test setup failed");

        std::fs::File::create(temp_dir.path().join("new.txt")).expect("test setup failed");

        let signal = tokio::time::timeout(std::time::Duration::from_secs(5), signals.recv())
            .await
            .expect("no signal within timeout");
        assert_eq!(signal, Some(Signal::Changed));
    }
}
