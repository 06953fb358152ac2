//! Concurrency control for slotdb
//!
//! The engine performs no locking; all coordination happens in the store's
//! conditional write. This crate supplies the two pieces around that loop:
//! - RetryPolicy: decides, after each conflict, whether to re-read and try again
//! - testing: a rendezvous harness that forces deterministic read/write interleavings
//!   (behind the `testing` feature)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod retry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use retry::{
    ExponentialBackoff, FixedDelay, NoRetry, RetryPolicy, DEFAULT_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
};
