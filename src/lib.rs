//! slotdb - optimistic concurrency for document stores
//!
//! slotdb wraps a document store in versioned record envelopes and performs
//! every mutation as a conditional write on the version observed at read
//! time. No lock manager is involved: losers of a race re-read and retry.
//!
//! # Quick Start
//!
//! ```
//! use slotdb::{Collection, InsertOptions, MemoryStore, Outcome, UpdateOptions, Value};
//!
//! let users = Collection::new(MemoryStore::new());
//! let id = Value::from("u1");
//! users
//!     .insert_one(Value::from(serde_json::json!({"_id": "u1", "visits": 0})), InsertOptions::new())
//!     .unwrap();
//!
//! users
//!     .update_by_id(&id, |mut v, _| {
//!         let visits = v.get("visits").and_then(Value::as_int).unwrap_or(0);
//!         v.as_object_mut().unwrap().insert("visits".into(), Value::from(visits + 1));
//!         Ok(Outcome::Put(v))
//!     }, UpdateOptions::new())
//!     .unwrap();
//!
//! let record = users.fetch_by_id(&id).unwrap();
//! assert_eq!(record.value.get("visits"), Some(&Value::Int(1)));
//! ```
//!
//! # Architecture
//!
//! - `slotdb-core`: values, envelopes, errors, the field codec
//! - `slotdb-storage`: the store adapter trait and an in-memory store
//! - `slotdb-concurrency`: retry policies and an interleaving test harness
//! - `slotdb-engine`: the collection and its conflict loop

pub use slotdb_concurrency::{
    ExponentialBackoff, FixedDelay, NoRetry, RetryPolicy, DEFAULT_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
};
pub use slotdb_core::{
    decode_value, encode_value, escape_key, project_upsert_default, translate_index_keys,
    translate_query, unescape_key, Document, ErrorCode, Layout, Metadata, ObjectId, Record,
    SlotError, SlotResult, Timestamp, Value, VersionToken, ID_FIELD,
};
pub use slotdb_engine::{
    Clock, Collection, CollectionBuilder, CollectionConfig, CounterVersions, DeleteOptions,
    InsertOptions, ManualClock, Mutation, Outcome, RandomVersions, RetryConfig, SystemClock,
    UpdateOptions, VersionGenerator, CONFIG_FILE_NAME,
};
pub use slotdb_storage::{
    DocumentCursor, DocumentStore, FindOptions, IndexOptions, MemoryStore, ReplaceOptions,
    StoreError, StoreResult, WriteResult, ID_INDEX,
};
