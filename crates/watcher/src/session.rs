//! Watch session
//!
//! A session owns one OS-level watch handle, the snapshot, the debouncer
//! and the list of attached subscribers. It runs as a single tokio task;
//! nothing else touches its state. Scans run on a `JoinSet` so the task
//! keeps receiving signals while a scan is in flight.

use crate::debouncer::{Debouncer, Generation};
use crate::differ::diff;
use crate::entry::{Delta, Entry};
use crate::loader::{EntrySource, Loader};
use crate::notifier::{signal_channel, ChangeNotifier, Signal, SignalReceiver, WatchHandle};
use crate::options::{ModifiedFn, TrackOptions};
use crate::snapshot::Snapshot;
use dirtrack_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle state of a watch session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Watch registered, initial scan not yet applied
    Starting,
    /// Initial scan applied; deltas are flowing
    Watching,
    /// Terminal
    Closed(CloseReason),
}

impl SessionState {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// Why a session closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The last subscriber detached
    Detached,
    /// The session was closed explicitly
    Closed,
    /// A scan or the OS-level watch failed
    Failed(String),
}

/// A subscriber as seen by the session
pub(crate) struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<Delta>,
    token: CancellationToken,
}

impl Subscriber {
    pub(crate) fn new(id: u64, tx: mpsc::UnboundedSender<Delta>, token: CancellationToken) -> Self {
        Self { id, tx, token }
    }

    /// Deliver a delta; false once the subscriber is gone
    fn deliver(&self, delta: &Delta) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.tx.send(delta.clone()).is_ok()
    }
}

pub(crate) enum Command {
    /// Attach a subscriber; the sender fires once it is in the list
    Attach(Subscriber, oneshot::Sender<()>),
    Detach(u64),
}

/// Handle to a running session, held by the tracker
#[derive(Clone)]
pub(crate) struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub(crate) fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Attach another subscriber
    ///
    /// Fails if the session closed before the subscriber was accepted.
    pub(crate) async fn attach(&self, subscriber: Subscriber) -> Result<()> {
        let id = subscriber.id;
        let token = subscriber.token.clone();
        let (ack_tx, ack_rx) = oneshot::channel();

        self.commands
            .send(Command::Attach(subscriber, ack_tx))
            .map_err(|_| Error::session_failed("session is no longer running"))?;
        ack_rx
            .await
            .map_err(|_| Error::session_failed("session closed while attaching"))?;

        self.detach_on_cancel(id, token);
        Ok(())
    }

    /// Wait until the session leaves `Starting`
    pub(crate) async fn started(&self) -> SessionState {
        let mut state = self.state.clone();
        let started = match state
            .wait_for(|s| !matches!(s, SessionState::Starting))
            .await
        {
            Ok(s) => s.clone(),
            // The session task dropped its sender without publishing Closed
            Err(_) => SessionState::Closed(CloseReason::Closed),
        };
        started
    }

    /// Wait until the session is closed
    pub(crate) async fn closed(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(SessionState::is_closed).await;
    }

    pub(crate) fn close(&self) {
        self.cancel.cancel();
    }

    /// Send `Detach` once the subscriber's token fires
    fn detach_on_cancel(&self, id: u64, token: CancellationToken) {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    let _ = commands.send(Command::Detach(id));
                }
                _ = commands.closed() => {}
            }
        });
    }
}

type ScanOutcome = (Generation, Result<Vec<Entry>>);

/// State owned by the session task
pub(crate) struct WatchSession {
    dir: PathBuf,
    loader: Arc<Loader>,
    is_modified: ModifiedFn,
    snapshot: Snapshot,
    debouncer: Debouncer,
    loaded: bool,
    subscribers: Vec<Subscriber>,
    scans: JoinSet<ScanOutcome>,
    state: watch::Sender<SessionState>,
    watch_handle: Option<Box<dyn WatchHandle>>,
}

impl WatchSession {
    /// Register the OS-level watch and spawn the session task
    ///
    /// Registration errors are returned here; the session never starts.
    /// `first` is attached before the initial scan so it receives the
    /// initial delta as a real delta.
    pub(crate) fn start(
        dir: &Path,
        options: &TrackOptions,
        notifier: &dyn ChangeNotifier,
        source: Arc<dyn EntrySource>,
        first: Subscriber,
    ) -> Result<SessionHandle> {
        let (sink, signals) = signal_channel(options.signal_queue_size);
        let watch_handle = notifier.watch(dir, sink)?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Starting);
        let cancel = CancellationToken::new();

        let handle = SessionHandle {
            commands: command_tx,
            state: state_rx,
            cancel: cancel.clone(),
        };
        handle.detach_on_cancel(first.id, first.token.clone());

        let session = Self {
            dir: dir.to_path_buf(),
            loader: Arc::new(Loader::new(
                dir,
                source,
                Arc::clone(&options.filter),
                options.follow_symlinks,
            )),
            is_modified: Arc::clone(&options.is_modified),
            snapshot: Snapshot::new(),
            debouncer: Debouncer::new(),
            loaded: false,
            subscribers: vec![first],
            scans: JoinSet::new(),
            state: state_tx,
            watch_handle: Some(watch_handle),
        };

        tokio::spawn(session.run(signals, command_rx, cancel));
        Ok(handle)
    }

    async fn run(
        mut self,
        mut signals: SignalReceiver,
        mut commands: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) {
        // Initial load, independent of any notification
        self.on_change();

        let reason = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break CloseReason::Closed,

                command = commands.recv() => {
                    let Some(command) = command else {
                        break CloseReason::Detached;
                    };
                    if let Some(reason) = self.handle_command(command) {
                        break reason;
                    }
                }

                Some(signal) = signals.recv() => match signal {
                    Signal::Changed => self.on_change(),
                    Signal::Failed(message) => {
                        break CloseReason::Failed(Error::watch_runtime(message).to_string());
                    }
                },

                Some(joined) = self.scans.join_next() => {
                    if let Some(reason) = self.on_scan_finished(joined) {
                        break reason;
                    }
                }
            }
        };

        self.close(reason);
    }

    fn handle_command(&mut self, command: Command) -> Option<CloseReason> {
        match command {
            Command::Attach(subscriber, ack) => {
                debug!("Subscriber {} attached to {:?}", subscriber.id, self.dir);
                if self.loaded {
                    let catch_up = Delta::catch_up(self.snapshot.entries());
                    if !subscriber.deliver(&catch_up) {
                        return self.prune();
                    }
                }
                self.subscribers.push(subscriber);
                let _ = ack.send(());
                None
            }
            Command::Detach(id) => {
                debug!("Subscriber {} detached from {:?}", id, self.dir);
                self.subscribers.retain(|s| s.id != id);
                self.prune()
            }
        }
    }

    fn on_change(&mut self) {
        match self.debouncer.signal() {
            Some(generation) => self.spawn_scan(generation),
            None => trace!("Scan in flight, follow-up scheduled"),
        }
    }

    fn spawn_scan(&mut self, generation: Generation) {
        debug!("Starting scan {} of {:?}", generation, self.dir);
        let loader = Arc::clone(&self.loader);
        self.scans
            .spawn(async move { (generation, loader.load().await) });
    }

    fn on_scan_finished(
        &mut self,
        joined: std::result::Result<ScanOutcome, JoinError>,
    ) -> Option<CloseReason> {
        let (generation, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => return Some(CloseReason::Failed(format!("Scan task failed: {e}"))),
        };

        let completion = self.debouncer.complete(generation);

        match (completion.apply, result) {
            (false, Ok(_)) => debug!(
                "Discarding stale scan {} (latest {})",
                generation,
                self.debouncer.latest()
            ),
            (false, Err(e)) => debug!("Discarding failed stale scan {}: {}", generation, e),
            (true, Err(e)) => {
                error!("Scan {} of {:?} failed: {}", generation, self.dir, e);
                return Some(CloseReason::Failed(e.to_string()));
            }
            (true, Ok(entries)) => {
                if let Some(reason) = self.apply(entries) {
                    return Some(reason);
                }
            }
        }

        if let Some(next) = completion.next {
            self.spawn_scan(next);
        }
        None
    }

    fn apply(&mut self, entries: Vec<Entry>) -> Option<CloseReason> {
        let delta = diff(&mut self.snapshot, entries, &*self.is_modified);
        let initial = !self.loaded;

        if initial {
            self.loaded = true;
            self.state.send_replace(SessionState::Watching);
            info!(
                "Tracking {:?} ({} entries)",
                self.dir,
                self.snapshot.len()
            );
        } else if delta.is_empty() {
            trace!("Scan produced no changes");
            return None;
        }

        debug!(
            "Delta for {:?}: {} added, {} removed",
            self.dir,
            delta.added().len(),
            delta.removed().len()
        );
        self.dispatch(&delta)
    }

    /// Send a delta to every live subscriber, dropping the rest
    fn dispatch(&mut self, delta: &Delta) -> Option<CloseReason> {
        self.subscribers.retain(|s| s.deliver(delta));
        self.prune()
    }

    fn prune(&mut self) -> Option<CloseReason> {
        self.subscribers.retain(|s| !s.token.is_cancelled() && !s.tx.is_closed());
        if self.subscribers.is_empty() {
            Some(CloseReason::Detached)
        } else {
            None
        }
    }

    fn close(mut self, reason: CloseReason) {
        self.scans.abort_all();
        self.watch_handle.take();
        self.snapshot.clear();
        self.subscribers.clear();

        match &reason {
            CloseReason::Failed(message) => {
                warn!("Stopped tracking {:?}: {}", self.dir, message)
            }
            _ => info!("Stopped tracking {:?} ({:?})", self.dir, reason),
        }
        self.state.send_replace(SessionState::Closed(reason));
    }
}
