//! Core types for slotdb
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: tagged tree for logical values, stored documents and filters
//! - ObjectId: generated record identifier
//! - Timestamp: microsecond timestamp stamped on every accepted write
//! - VersionToken: opaque per-write token used for compare-and-swap
//! - Record: the versioned envelope around a logical value
//! - SlotError: error taxonomy with stable machine codes
//! - codec: escaping and layout of stored documents, query translation
//! - projector: default value synthesis for upserts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod id;
pub mod path;
pub mod projector;
pub mod record;
pub mod timestamp;
pub mod value;
pub mod version;

pub use codec::{
    decode_value, encode_value, escape_key, translate_index_keys, translate_query, unescape_key,
    Layout,
};
pub use error::{BoxError, ErrorCode, SlotError, SlotResult};
pub use id::ObjectId;
pub use projector::project_upsert_default;
pub use record::{validate_value, Metadata, Record, ID_FIELD};
pub use timestamp::Timestamp;
pub use value::{Document, Value};
pub use version::{VersionToken, VersionTokenError};
