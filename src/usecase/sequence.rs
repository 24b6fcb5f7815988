use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic ticket counter for session checks.
///
/// Each check takes a ticket before it goes to the network and may only apply
/// its result while that ticket is still the latest one. Session transitions
/// call [`CheckSequencer::advance`] so checks started before them are dropped.
#[derive(Debug, Default)]
pub struct CheckSequencer {
    latest: AtomicU64,
}

impl CheckSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_latest(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }

    pub fn advance(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts of sessions started and ended so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch {
    started: u64,
    ended: u64,
}

impl Epoch {
    /// True when a session ended after `self` was taken.
    pub fn ended_before(self, now: Epoch) -> bool {
        now.ended != self.ended
    }

    /// True when a session started or ended after `self` was taken.
    pub fn changed_before(self, now: Epoch) -> bool {
        self != now
    }
}

/// Session start/end counters. Requests that outlive a transition compare
/// the epoch they started under against the current one.
#[derive(Debug, Default)]
pub struct SessionEpochs {
    started: AtomicU64,
    ended: AtomicU64,
}

impl SessionEpochs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Epoch {
        Epoch {
            started: self.started.load(Ordering::SeqCst),
            ended: self.ended.load(Ordering::SeqCst),
        }
    }

    pub fn mark_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    pub fn mark_ended(&self) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}
