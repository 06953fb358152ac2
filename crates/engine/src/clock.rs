//! Time source injected into collections
//!
//! The engine never reads the system clock directly; every mutation asks its
//! [`Clock`] once for the operation's "now".

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use slotdb_core::Timestamp;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven clock for deterministic tests
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Start at `at`
    pub fn new(at: Timestamp) -> Self {
        Self {
            micros: AtomicU64::new(at.as_micros()),
        }
    }

    /// Start at `millis` milliseconds since epoch
    pub fn at_millis(millis: u64) -> Self {
        Self::new(Timestamp::from_millis(millis))
    }

    /// Jump to `at`
    pub fn set(&self, at: Timestamp) {
        self.micros.store(at.as_micros(), Ordering::SeqCst);
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::SeqCst))
    }
}
