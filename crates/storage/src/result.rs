//! Raw operation results
//!
//! Every write returns a [`WriteResult`] in the shape document stores
//! conventionally report: acknowledgement plus per-kind counts. The engine
//! passes it through to callers for introspection.

use serde::{Deserialize, Serialize};
use slotdb_core::Value;

/// Outcome counts of a single write operation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WriteResult {
    /// The store accepted the request
    pub acknowledged: bool,
    /// Documents matched by a replace filter
    pub matched_count: u64,
    /// Documents actually changed by a replace
    pub modified_count: u64,
    /// Documents removed
    pub deleted_count: u64,
    /// Documents created by an upserting replace
    pub upserted_count: u64,
    /// Identifier of an inserted document
    pub inserted_id: Option<Value>,
    /// Identifier of a document created by an upserting replace
    pub upserted_id: Option<Value>,
}

impl WriteResult {
    /// Acknowledged result with all counts zero
    pub fn noop() -> Self {
        Self {
            acknowledged: true,
            ..Self::default()
        }
    }

    /// Result of a successful insert
    pub fn inserted(id: Value) -> Self {
        Self {
            acknowledged: true,
            inserted_id: Some(id),
            ..Self::default()
        }
    }

    /// Result of a replace
    pub fn replaced(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            ..Self::default()
        }
    }

    /// Result of an upserting replace that created a document
    pub fn upserted(id: Value) -> Self {
        Self {
            acknowledged: true,
            upserted_count: 1,
            upserted_id: Some(id),
            ..Self::default()
        }
    }

    /// Result of a delete
    pub fn deleted(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
            ..Self::default()
        }
    }
}
