//! Scan debouncing
//!
//! Collapses bursts of raw change signals into single scans. The debouncer
//! is a pure state machine: the watch session feeds it signals and scan
//! completions and it answers whether to start a scan and whether a finished
//! scan's result may be applied.
//!
//! Every signal advances the [`Generation`]. A scan is stamped with the
//! generation current when it starts, and its result is applied only if no
//! newer signal arrived while it ran. Signals arriving mid-scan schedule
//! exactly one follow-up scan no matter how many of them there are.

use tracing::trace;

/// Staleness marker for scans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a finished scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Whether the scan's result may be applied to the snapshot
    pub apply: bool,
    /// Follow-up scan to start now, if one was requested while this one ran
    pub next: Option<Generation>,
}

/// Coalesces change signals into at most one in-flight scan
#[derive(Debug, Default)]
pub struct Debouncer {
    latest: Generation,
    in_flight: Option<Generation>,
    follow_up: bool,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change signal
    ///
    /// Returns the generation of a scan to start now, or `None` if a scan
    /// is already running (a follow-up is scheduled instead).
    pub fn signal(&mut self) -> Option<Generation> {
        self.latest = self.latest.next();

        if self.in_flight.is_some() {
            if self.follow_up {
                trace!("Coalesced signal into pending follow-up scan");
            }
            self.follow_up = true;
            return None;
        }

        self.in_flight = Some(self.latest);
        Some(self.latest)
    }

    /// Record that the scan stamped `generation` finished
    pub fn complete(&mut self, generation: Generation) -> Completion {
        if self.in_flight != Some(generation) {
            trace!("Ignoring completion of unknown scan {}", generation);
            return Completion {
                apply: false,
                next: None,
            };
        }

        self.in_flight = None;
        let apply = generation == self.latest;

        let next = if self.follow_up {
            self.follow_up = false;
            self.in_flight = Some(self.latest);
            Some(self.latest)
        } else {
            None
        };

        Completion { apply, next }
    }

    /// The most recent generation handed out
    pub fn latest(&self) -> Generation {
        self.latest
    }
}
