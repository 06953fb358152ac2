//! Microsecond-precision timestamp type
//!
//! Every record carries two timestamps: `created_at`, fixed by the first
//! successful insert, and `updated_at`, set to the mutation's observed "now" on
//! every accepted write.
//!
//! ## Precision
//!
//! Timestamps are stored as microseconds since Unix epoch. In a stored document
//! they appear as `Value::Int` microseconds; reading also accepts a `Value::Float`
//! so that documents which went through a float-only serializer still decode.
//!
//! ```
//! use slotdb_core::Timestamp;
//!
//! let from_millis = Timestamp::from_millis(1_000);
//! assert_eq!(from_millis.as_micros(), 1_000_000);
//! ```

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microsecond-precision timestamp
///
/// ## Invariants
///
/// - Timestamps are always non-negative (u64)
/// - Timestamps are comparable and orderable
/// - The zero timestamp represents Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch if the system clock reads before Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000))
    }

    /// Get microseconds since Unix epoch
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Get milliseconds since Unix epoch (truncates)
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000
    }

    /// Add a duration to this timestamp, saturating on overflow
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.as_micros() as u64))
    }

    /// Stored-document representation
    pub fn to_value(self) -> Value {
        Value::Int(self.0.min(i64::MAX as u64) as i64)
    }

    /// Read a timestamp back out of a stored document field
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) if *i >= 0 => Some(Timestamp(*i as u64)),
            Value::Float(f) if f.is_finite() && *f >= 0.0 => Some(Timestamp(*f as u64)),
            _ => None,
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0 / 1_000_000;
        let micros = self.0 % 1_000_000;
        write!(f, "{}.{:06}", secs, micros)
    }
}

impl From<Duration> for Timestamp {
    /// Create from duration since epoch
    fn from(duration: Duration) -> Self {
        Timestamp::from_micros(duration.as_micros() as u64)
    }
}
