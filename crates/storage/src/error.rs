//! Store adapter errors
//!
//! Adapters report failures with [`StoreError`]. Only one variant carries
//! meaning for the OCC engine: [`StoreError::DuplicateKey`] on insert is a lost
//! race, not a failure. Everything else is surfaced to callers wrapped with its
//! cause.

use thiserror::Error;

/// Result type alias for store adapter operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error reported by a store adapter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// A unique index (including `_id`) already holds this key
    #[error("Duplicate key in index {index}: {key}")]
    DuplicateKey {
        /// Index name
        index: String,
        /// Rendered key value
        key: String,
    },

    /// Backend failure
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Operation or filter construct not supported by this adapter
    #[error("Unsupported by store: {0}")]
    Unsupported(String),
}

impl StoreError {
    /// Check if this is a duplicate-identifier signal
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }

    /// Check if this is a duplicate on the `_id` index specifically
    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { index, .. } if index == crate::memory::ID_INDEX)
    }
}
