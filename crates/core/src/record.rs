//! Record envelope
//!
//! A [`Record`] is the versioned wrapper around a caller's logical value:
//! identifier, value, creation time, last-modified time, version token and
//! caller metadata. The engine returns records; callers never construct the
//! stored representation themselves.

use crate::error::{SlotError, SlotResult};
use crate::timestamp::Timestamp;
use crate::value::{Document, Value};
use crate::version::VersionToken;
use serde::{Deserialize, Serialize};

/// Name of the identifier field, in logical values and stored documents alike
pub const ID_FIELD: &str = "_id";

/// Caller-supplied metadata attached to a record
pub type Metadata = Document;

/// Versioned envelope around one logical value
///
/// ## Invariants
///
/// - `value` is an object and carries `_id` equal to `id`
/// - `created_at` never changes after the first accepted insert
/// - `version` changes on every accepted write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier
    pub id: Value,
    /// Logical value, `_id` included
    pub value: Value,
    /// Time of the first accepted insert
    pub created_at: Timestamp,
    /// Time of the latest accepted write
    pub updated_at: Timestamp,
    /// Version token of this state
    pub version: VersionToken,
    /// Caller metadata (empty when none was given)
    pub metadata: Metadata,
}

impl Record {
    /// Logical value without the identifier field
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.value
            .as_object()
            .into_iter()
            .flat_map(|o| o.iter())
            .filter(|(k, _)| k.as_str() != ID_FIELD)
    }
}

/// Check that a value can be stored as a record
///
/// Values must be structured, non-array and non-null: in this model, an
/// `Object`. `what` names the value in the error message.
pub fn validate_value(value: &Value, what: &str) -> SlotResult<()> {
    if value.is_object() {
        Ok(())
    } else {
        Err(SlotError::invalid_value(format!(
            "{} must be a non-array, non-null object. Was: {}",
            what,
            value.type_name()
        )))
    }
}
