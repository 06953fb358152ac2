//! Field codec
//!
//! Maps between a [`Record`] and the document actually handed to the store.
//! The store's filter language gives `$` (operators) and `.` (paths) special
//! meaning, so every structural key is escaped on the way in:
//!
//! | Character | Escape |
//! |-----------|--------|
//! | `%`       | `%25`  |
//! | `$`       | `%24`  |
//! | `.`       | `%2E`  |
//!
//! Escaping is a single character-mapping pass, which is equivalent to
//! replacing `%` first. Unescaping is a single left-to-right scan and is the
//! exact inverse, so `unescape_key(&escape_key(k)) == k` for every string.
//!
//! ## Layouts
//!
//! - [`Layout::Segregated`]: top-level logical fields are stored as `v_<key>`,
//!   metadata as `m_<key>`, beside the bookkeeping fields `_id`, `createdAt`,
//!   `updatedAt` and `version`.
//! - [`Layout::Embedded`]: logical fields are stored unprefixed and the
//!   bookkeeping fields live in the same namespace under reserved names
//!   (`_createdAt`, `_updatedAt`, `_version`, `_metadata`). Decoded values carry
//!   those fields so transforms can see them.
//!
//! Nested keys are escaped but never prefixed. Arrays are walked uniformly and
//! [`Value::Id`] is opaque.

use crate::error::{SlotError, SlotResult};
use crate::path::{has_operator_keys, is_operator, split_path};
use crate::record::{Metadata, Record, ID_FIELD};
use crate::timestamp::Timestamp;
use crate::value::{Document, Value};
use crate::version::VersionToken;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Prefix for top-level logical fields in the segregated layout
pub const VALUE_PREFIX: &str = "v_";
/// Prefix for metadata fields in the segregated layout
pub const METADATA_PREFIX: &str = "m_";

/// Segregated bookkeeping field names
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Segregated bookkeeping field names
pub const UPDATED_AT_FIELD: &str = "updatedAt";
/// Segregated bookkeeping field names
pub const VERSION_FIELD: &str = "version";

/// Embedded bookkeeping field names
pub const EMBEDDED_CREATED_AT: &str = "_createdAt";
/// Embedded bookkeeping field names
pub const EMBEDDED_UPDATED_AT: &str = "_updatedAt";
/// Embedded bookkeeping field names
pub const EMBEDDED_VERSION: &str = "_version";
/// Embedded bookkeeping field names
pub const EMBEDDED_METADATA: &str = "_metadata";

/// All bookkeeping fields of the embedded layout
pub const EMBEDDED_BOOKKEEPING: [&str; 4] = [
    EMBEDDED_CREATED_AT,
    EMBEDDED_UPDATED_AT,
    EMBEDDED_VERSION,
    EMBEDDED_METADATA,
];

/// Prefix reserved for bookkeeping fields in the embedded layout
pub const RESERVED_PREFIX: char = '_';

/// Index key that matches every field
pub const WILDCARD_INDEX_KEY: &str = "$**";

/// Where envelope bookkeeping lives relative to the logical value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Logical fields prefixed, bookkeeping beside them
    #[default]
    Segregated,
    /// Bookkeeping embedded in the logical namespace
    Embedded,
}

// ============================================================================
// Key escaping
// ============================================================================

/// Escape reserved characters in a single key
pub fn escape_key(key: &str) -> Cow<'_, str> {
    if !key.contains(|c| matches!(c, '%' | '$' | '.')) {
        return Cow::Borrowed(key);
    }

    let mut out = String::with_capacity(key.len() + 8);
    for ch in key.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '$' => out.push_str("%24"),
            '.' => out.push_str("%2E"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Reverse [`escape_key`]
///
/// A `%` that does not start one of the three escape sequences is kept as-is.
pub fn unescape_key(key: &str) -> Cow<'_, str> {
    if !key.contains('%') {
        return Cow::Borrowed(key);
    }

    let mut out = String::with_capacity(key.len());
    let mut rest = key;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = if tail.starts_with("%25") {
            Some('%')
        } else if tail.starts_with("%24") {
            Some('$')
        } else if tail.starts_with("%2E") {
            Some('.')
        } else {
            None
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[3..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Escape every structural key in a value tree
pub fn encode_value(value: &Value) -> Value {
    map_keys(value, &|k| escape_key(k).into_owned())
}

/// Unescape every structural key in a value tree
pub fn decode_value(value: &Value) -> Value {
    map_keys(value, &|k| unescape_key(k).into_owned())
}

fn map_keys(value: &Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (f(k), map_keys(v, f)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| map_keys(v, f)).collect()),
        other => other.clone(),
    }
}

fn encode_document(doc: &Document) -> Document {
    doc.iter()
        .map(|(k, v)| (escape_key(k).into_owned(), encode_value(v)))
        .collect()
}

fn decode_document(doc: &Document) -> Document {
    doc.iter()
        .map(|(k, v)| (unescape_key(k).into_owned(), decode_value(v)))
        .collect()
}

// ============================================================================
// Record <-> stored document
// ============================================================================

impl Layout {
    /// Stored field holding the version token
    pub fn version_field(&self) -> &'static str {
        match self {
            Layout::Segregated => VERSION_FIELD,
            Layout::Embedded => EMBEDDED_VERSION,
        }
    }

    fn created_at_field(&self) -> &'static str {
        match self {
            Layout::Segregated => CREATED_AT_FIELD,
            Layout::Embedded => EMBEDDED_CREATED_AT,
        }
    }

    fn updated_at_field(&self) -> &'static str {
        match self {
            Layout::Segregated => UPDATED_AT_FIELD,
            Layout::Embedded => EMBEDDED_UPDATED_AT,
        }
    }

    fn value_prefix(&self) -> &'static str {
        match self {
            Layout::Segregated => VALUE_PREFIX,
            Layout::Embedded => "",
        }
    }

    /// Encode a record into the document handed to the store
    pub fn encode(&self, record: &Record) -> Document {
        let mut doc = Document::new();
        doc.insert(ID_FIELD.to_string(), record.id.clone());
        doc.insert(
            self.created_at_field().to_string(),
            record.created_at.to_value(),
        );
        doc.insert(
            self.updated_at_field().to_string(),
            record.updated_at.to_value(),
        );
        doc.insert(
            self.version_field().to_string(),
            Value::String(record.version.as_str().to_string()),
        );

        match self {
            Layout::Segregated => {
                for (k, v) in record.fields() {
                    doc.insert(
                        format!("{}{}", VALUE_PREFIX, escape_key(k)),
                        encode_value(v),
                    );
                }
                for (k, v) in &record.metadata {
                    doc.insert(
                        format!("{}{}", METADATA_PREFIX, escape_key(k)),
                        encode_value(v),
                    );
                }
            }
            Layout::Embedded => {
                for (k, v) in record.fields() {
                    if !is_embedded_bookkeeping(k) {
                        doc.insert(escape_key(k).into_owned(), encode_value(v));
                    }
                }
                doc.insert(
                    EMBEDDED_METADATA.to_string(),
                    Value::Object(encode_document(&record.metadata)),
                );
            }
        }

        doc
    }

    /// Decode a stored document back into a record
    ///
    /// Fails with `MalformedDocument` when a bookkeeping field is missing or
    /// has the wrong type.
    pub fn decode(&self, doc: &Document) -> SlotResult<Record> {
        let id = doc
            .get(ID_FIELD)
            .cloned()
            .ok_or_else(|| SlotError::malformed("missing _id"))?;
        let created_at = self.timestamp_field(doc, self.created_at_field())?;
        let updated_at = self.timestamp_field(doc, self.updated_at_field())?;
        let version = doc
            .get(self.version_field())
            .and_then(Value::as_str)
            .map(VersionToken::new_unchecked)
            .ok_or_else(|| {
                SlotError::malformed(format!("missing or non-string {}", self.version_field()))
            })?;

        let mut value = Document::new();
        let mut metadata = Metadata::new();

        match self {
            Layout::Segregated => {
                for (k, v) in doc {
                    if let Some(rest) = k.strip_prefix(VALUE_PREFIX) {
                        value.insert(unescape_key(rest).into_owned(), decode_value(v));
                    } else if let Some(rest) = k.strip_prefix(METADATA_PREFIX) {
                        metadata.insert(unescape_key(rest).into_owned(), decode_value(v));
                    }
                }
            }
            Layout::Embedded => {
                for (k, v) in doc {
                    if k == EMBEDDED_METADATA {
                        let Value::Object(m) = v else {
                            return Err(SlotError::malformed(format!(
                                "non-object {}",
                                EMBEDDED_METADATA
                            )));
                        };
                        metadata = decode_document(m);
                    } else if k != ID_FIELD && !is_embedded_bookkeeping(k) {
                        value.insert(unescape_key(k).into_owned(), decode_value(v));
                    }
                }
            }
        }
        value.insert(ID_FIELD.to_string(), id.clone());

        let mut record = Record {
            id,
            value: Value::Object(value),
            created_at,
            updated_at,
            version,
            metadata,
        };
        self.attach_bookkeeping(&mut record);
        Ok(record)
    }

    /// Mirror the envelope fields into the logical value (embedded layout only)
    pub fn attach_bookkeeping(&self, record: &mut Record) {
        if *self != Layout::Embedded {
            return;
        }
        let created_at = record.created_at.to_value();
        let updated_at = record.updated_at.to_value();
        let version = Value::String(record.version.as_str().to_string());
        let metadata = Value::Object(record.metadata.clone());
        if let Some(obj) = record.value.as_object_mut() {
            obj.insert(EMBEDDED_CREATED_AT.to_string(), created_at);
            obj.insert(EMBEDDED_UPDATED_AT.to_string(), updated_at);
            obj.insert(EMBEDDED_VERSION.to_string(), version);
            obj.insert(EMBEDDED_METADATA.to_string(), metadata);
        }
    }

    fn timestamp_field(&self, doc: &Document, field: &str) -> SlotResult<Timestamp> {
        doc.get(field)
            .and_then(Timestamp::from_value)
            .ok_or_else(|| SlotError::malformed(format!("missing or invalid {}", field)))
    }

    /// Filter matching exactly one record state: `{ _id, version }`
    pub fn cas_filter(&self, id: &Value, version: &VersionToken) -> Document {
        let mut filter = Document::new();
        filter.insert(ID_FIELD.to_string(), id.clone());
        filter.insert(
            self.version_field().to_string(),
            Value::String(version.as_str().to_string()),
        );
        filter
    }

    // ========================================================================
    // Query translation
    // ========================================================================

    /// Translate a logical filter into a stored-document filter
    ///
    /// Top-level field paths are escaped segment by segment and prefixed;
    /// `_id` and operator keys pass through verbatim. `$and`, `$or` and `$nor`
    /// clauses are translated as filters of their own. Operands are literals
    /// and are escaped exactly like stored values.
    pub fn translate_query(&self, filter: &Document) -> Document {
        filter
            .iter()
            .map(|(k, v)| {
                if k == ID_FIELD {
                    (k.clone(), v.clone())
                } else if is_operator(k) {
                    let translated = match k.as_str() {
                        "$and" | "$or" | "$nor" => self.translate_clauses(v),
                        _ => translate_operand(v),
                    };
                    (k.clone(), translated)
                } else {
                    (self.field_path(k), translate_operand(v))
                }
            })
            .collect()
    }

    fn translate_clauses(&self, clauses: &Value) -> Value {
        match clauses {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(sub) => Value::Object(self.translate_query(sub)),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            other => translate_operand(other),
        }
    }

    /// Translate an index key specification
    ///
    /// Like [`Layout::translate_query`] for the keys; `_id` and the wildcard
    /// `$**` pass through and index directions are left untouched.
    pub fn translate_index_keys(&self, keys: &Document) -> Document {
        keys.iter()
            .map(|(k, v)| {
                if k == ID_FIELD || k == WILDCARD_INDEX_KEY {
                    (k.clone(), v.clone())
                } else {
                    (self.field_path(k), v.clone())
                }
            })
            .collect()
    }

    fn field_path(&self, path: &str) -> String {
        let escaped: Vec<Cow<'_, str>> = split_path(path).map(escape_key).collect();
        format!("{}{}", self.value_prefix(), escaped.join("."))
    }
}

/// Translate the value a field is matched against
///
/// An object with operator keys is an operator document: operator keys stay
/// verbatim and each operand is a literal, escaped the way values are
/// stored. `$not` wraps another operator document. Anything else is a
/// literal.
fn translate_operand(value: &Value) -> Value {
    match value {
        Value::Object(ops) if has_operator_keys(ops) => Value::Object(
            ops.iter()
                .map(|(op, operand)| {
                    let operand = match op.as_str() {
                        "$not" => translate_operand(operand),
                        _ => encode_value(operand),
                    };
                    (op.clone(), operand)
                })
                .collect(),
        ),
        literal => encode_value(literal),
    }
}

/// Check if a key is one of the embedded layout's bookkeeping fields
pub fn is_embedded_bookkeeping(key: &str) -> bool {
    EMBEDDED_BOOKKEEPING.contains(&key)
}

/// Translate a filter for the default (segregated) layout
pub fn translate_query(filter: &Document) -> Document {
    Layout::Segregated.translate_query(filter)
}

/// Translate index keys for the default (segregated) layout
pub fn translate_index_keys(keys: &Document) -> Document {
    Layout::Segregated.translate_index_keys(keys)
}
