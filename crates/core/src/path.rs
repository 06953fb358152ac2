//! Dotted field paths
//!
//! Filters address nested fields with dotted paths (`"address.city"`) and
//! mark operators with a leading `$`. Numeric segments index into arrays when
//! reading.

use crate::value::{Document, Value};

/// Operator sigil used by filter documents
pub const OPERATOR_SIGIL: char = '$';

/// Path separator used by filter documents
pub const PATH_SEPARATOR: char = '.';

/// Check if a filter key is an operator (`$eq`, `$and`, ...)
#[inline]
pub fn is_operator(key: &str) -> bool {
    key.starts_with(OPERATOR_SIGIL)
}

/// Check if an object has at least one operator key
pub fn has_operator_keys(doc: &Document) -> bool {
    doc.keys().any(|k| is_operator(k))
}

/// Split a dotted path into segments
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR)
}

/// Resolve a dotted path against a document
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = split_path(path);
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(obj) => obj.get(segment)?,
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Assign `value` at a dotted path, materializing intermediate objects
///
/// An intermediate that exists but is not an object is replaced by one.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    let segments: Vec<&str> = split_path(path).collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = doc;
    for segment in parents {
        let slot = current
            .entry((*segment).to_string())
            .or_insert_with(Value::object);
        if !slot.is_object() {
            *slot = Value::object();
        }
        current = match slot {
            Value::Object(obj) => obj,
            _ => return,
        };
    }
    current.insert((*last).to_string(), value);
}
