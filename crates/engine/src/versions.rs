//! Version token generation injected into collections
//!
//! Every accepted write stamps the record with a fresh token from the
//! collection's [`VersionGenerator`].

use std::sync::atomic::{AtomicU64, Ordering};

use slotdb_core::VersionToken;

/// Source of fresh version tokens
pub trait VersionGenerator: Send + Sync {
    /// Next token; must differ from every token still stored
    fn next_version(&self) -> VersionToken;
}

/// Random 8-byte tokens, URL-safe base64
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomVersions;

impl VersionGenerator for RandomVersions {
    fn next_version(&self) -> VersionToken {
        VersionToken::random()
    }
}

/// Sequential tokens `1`, `2`, `3`, ... for deterministic tests
///
/// The counter is shared by every record in the collection.
#[derive(Debug, Default)]
pub struct CounterVersions {
    next: AtomicU64,
}

impl CounterVersions {
    /// Start at `1`
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionGenerator for CounterVersions {
    fn next_version(&self) -> VersionToken {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        VersionToken::new_unchecked(n.to_string())
    }
}
