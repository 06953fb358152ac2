//! Retry policies for the conflict loop
//!
//! After every CONFLICT the engine asks its policy whether to try again,
//! passing the number of attempts made so far. The policy is the single
//! extension point for delay, cancellation and deadlines: it may block before
//! answering, and it is consulted afresh on every conflict.
//!
//! # Example
//! ```
//! use slotdb_concurrency::{FixedDelay, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = FixedDelay::new(5, Duration::ZERO);
//! assert!(policy.should_retry(4));
//! assert!(!policy.should_retry(5));
//! ```

use std::time::Duration;

use tracing::trace;

/// Default number of total attempts
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default delay between attempts in milliseconds
pub const DEFAULT_DELAY_MS: u64 = 200;

/// Decides whether another attempt follows a conflict
///
/// `attempts` counts attempts already made, so the first call sees `1`.
/// Implementations may sleep before returning `true`.
pub trait RetryPolicy: Send + Sync {
    /// Return `true` to re-read and try again
    fn should_retry(&self, attempts: usize) -> bool;
}

impl<F> RetryPolicy for F
where
    F: Fn(usize) -> bool + Send + Sync,
{
    fn should_retry(&self, attempts: usize) -> bool {
        self(attempts)
    }
}

// ============================================================================
// Fixed delay
// ============================================================================

/// Fixed delay between attempts, bounded total attempts
///
/// The default is three total attempts with 200 ms between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    /// Total attempts allowed, the first one included
    pub max_attempts: usize,
    /// Sleep before each retry
    pub delay: Duration,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

impl FixedDelay {
    /// Create a policy
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Retry without sleeping
    pub fn immediate(max_attempts: usize) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Set total attempts
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set delay between attempts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl RetryPolicy for FixedDelay {
    fn should_retry(&self, attempts: usize) -> bool {
        if attempts >= self.max_attempts {
            return false;
        }
        if !self.delay.is_zero() {
            trace!(target: "slotdb::occ", attempts, delay_ms = self.delay.as_millis() as u64, "Backing off");
            std::thread::sleep(self.delay);
        }
        true
    }
}

// ============================================================================
// Exponential backoff
// ============================================================================

/// Exponential backoff between attempts, capped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    /// Total attempts allowed, the first one included
    pub max_attempts: usize,
    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound on any single delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 10,
            max_delay_ms: 100,
        }
    }
}

impl ExponentialBackoff {
    /// Create a policy with default delays
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total attempts
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set base delay for exponential backoff
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set maximum delay between retries
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Delay before the retry that follows attempt number `attempts`
    pub fn calculate_delay(&self, attempts: usize) -> Duration {
        // Cap the shift to prevent overflow
        let shift = attempts.saturating_sub(1).min(63);
        let multiplier = 1u64 << shift;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn should_retry(&self, attempts: usize) -> bool {
        if attempts >= self.max_attempts {
            return false;
        }
        let delay = self.calculate_delay(attempts);
        trace!(target: "slotdb::occ", attempts, delay_ms = delay.as_millis() as u64, "Backing off");
        std::thread::sleep(delay);
        true
    }
}

// ============================================================================
// No retry
// ============================================================================

/// Never retry: the first conflict exhausts the operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn should_retry(&self, _attempts: usize) -> bool {
        false
    }
}
