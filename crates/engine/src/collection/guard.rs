//! Protected fields for the embedded layout
//!
//! With [`Layout::Embedded`](slotdb_core::Layout) the bookkeeping fields
//! (`_createdAt`, `_updatedAt`, `_version`, `_metadata`) sit next to the
//! caller's own fields. A transform sees them and may hand them back, but it
//! may not change them:
//!
//! - a bookkeeping field returned with a different value is an invalid update
//! - a bookkeeping field left out is restored from the previous state
//! - any other `_`-prefixed field except `_id` is reserved and rejected
//!
//! Values are compared canonically, so a timestamp that came back as a float
//! after a serialization round trip still counts as unchanged.

use slotdb_core::codec::{is_embedded_bookkeeping, EMBEDDED_BOOKKEEPING, RESERVED_PREFIX};
use slotdb_core::{Document, SlotError, SlotResult, Value, ID_FIELD};

/// Reject reserved application fields
///
/// Used for values that have no previous state (inserts), where no
/// bookkeeping field may appear at all.
pub(crate) fn reject_reserved(value: &Document) -> SlotResult<()> {
    match value
        .keys()
        .find(|k| k.starts_with(RESERVED_PREFIX) && k.as_str() != ID_FIELD)
    {
        Some(key) => Err(SlotError::invalid_value(format!(
            "Field {:?} uses the reserved '{}' prefix",
            key, RESERVED_PREFIX
        ))),
        None => Ok(()),
    }
}

/// Check a transform result against the value it was computed from
///
/// Restores omitted bookkeeping fields in `next`.
pub(crate) fn protect(previous: &Value, next: &mut Document) -> SlotResult<()> {
    for field in EMBEDDED_BOOKKEEPING {
        let before = previous.get(field);
        match (next.get(field), before) {
            (None, Some(before)) => {
                next.insert(field.to_string(), before.clone());
            }
            (None, None) => {}
            (Some(after), Some(before)) if after.canonical_eq(before) => {}
            (Some(_), _) => {
                return Err(SlotError::invalid_update(format!(
                    "Cannot modify protected field {}",
                    field
                )));
            }
        }
    }

    match next.keys().find(|k| {
        k.starts_with(RESERVED_PREFIX) && k.as_str() != ID_FIELD && !is_embedded_bookkeeping(k)
    }) {
        Some(key) => Err(SlotError::invalid_value(format!(
            "Field {:?} uses the reserved '{}' prefix",
            key, RESERVED_PREFIX
        ))),
        None => Ok(()),
    }
}
