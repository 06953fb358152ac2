//! Versioned collection over a document store
//!
//! A [`Collection`] wraps any [`DocumentStore`] and stores every logical
//! value inside a versioned [`Record`] envelope. Reads decode envelopes;
//! writes go through the optimistic read-modify-write loop in [`mutate`].
//!
//! # Example
//!
//! ```ignore
//! use slotdb_engine::{Collection, InsertOptions, Outcome, UpdateOptions};
//! use slotdb_storage::MemoryStore;
//!
//! let users = Collection::new(MemoryStore::new());
//! users.insert_one(doc, InsertOptions::new())?;
//! users.update_by_id(&id, |mut v, _| {
//!     v.as_object_mut().unwrap().insert("seen".into(), true.into());
//!     Ok(Outcome::Put(v))
//! }, UpdateOptions::new())?;
//! ```

mod builder;
pub mod config;
mod guard;
pub mod mutate;
pub mod options;

pub use builder::CollectionBuilder;
pub use mutate::{Mutation, Outcome};

use std::path::Path;
use std::sync::Arc;

use slotdb_concurrency::RetryPolicy;
use slotdb_core::{
    validate_value, Document, Layout, ObjectId, Record, SlotError, SlotResult, Value, ID_FIELD,
};
use slotdb_storage::{DocumentStore, FindOptions, IndexOptions, StoreError, WriteResult};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::versions::VersionGenerator;
use options::InsertOptions;

/// OCC engine bound to one document store
///
/// The collection holds no mutable state of its own: every coordination
/// point is a conditional write in the store. It can be shared freely
/// across threads.
#[derive(Clone)]
pub struct Collection<S> {
    store: S,
    layout: Layout,
    strict_reads: bool,
    clock: Arc<dyn Clock>,
    versions: Arc<dyn VersionGenerator>,
    retry: Arc<dyn RetryPolicy>,
}

impl<S: DocumentStore> Collection<S> {
    /// Collection with default configuration, system clock and random versions
    pub fn new(store: S) -> Self {
        CollectionBuilder::new(store).build()
    }

    /// Start configuring a collection
    pub fn builder(store: S) -> CollectionBuilder<S> {
        CollectionBuilder::new(store)
    }

    /// Open a collection configured by a `slotdb.toml` file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn open_with_config_file(store: S, path: &Path) -> SlotResult<Self> {
        Ok(CollectionBuilder::new(store).config_file(path)?.build())
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored document layout
    pub fn layout(&self) -> Layout {
        self.layout
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Find the first value matching a logical filter
    ///
    /// # Errors
    ///
    /// With `strict_reads`, fails with `NO_SUCH_ENTITY` when nothing matches.
    pub fn find_one(&self, filter: &Document) -> SlotResult<Option<Value>> {
        Ok(self.find_one_record(filter)?.map(|record| record.value))
    }

    /// Find the first record matching a logical filter
    ///
    /// # Errors
    ///
    /// With `strict_reads`, fails with `NO_SUCH_ENTITY` when nothing matches.
    pub fn find_one_record(&self, filter: &Document) -> SlotResult<Option<Record>> {
        match self.read(filter)? {
            None if self.strict_reads => Err(no_such_entity(filter)),
            found => Ok(found),
        }
    }

    /// Record with identifier `id`, or `None`
    pub fn find_by_id(&self, id: &Value) -> SlotResult<Option<Record>> {
        self.read(&id_filter(id))
    }

    /// Record with identifier `id`
    ///
    /// # Errors
    ///
    /// Fails with `NO_SUCH_ENTITY` when the record does not exist.
    pub fn fetch_by_id(&self, id: &Value) -> SlotResult<Record> {
        let filter = id_filter(id);
        self.read(&filter)?.ok_or_else(|| no_such_entity(&filter))
    }

    /// Lazily decode every value matching a logical filter
    pub fn find(
        &self,
        filter: &Document,
    ) -> SlotResult<impl Iterator<Item = SlotResult<Value>> + Send> {
        Ok(self.find_records(filter)?.map(|r| r.map(|record| record.value)))
    }

    /// Lazily decode every record matching a logical filter
    ///
    /// Each call starts a fresh cursor. Decoding errors surface per item.
    pub fn find_records(
        &self,
        filter: &Document,
    ) -> SlotResult<impl Iterator<Item = SlotResult<Record>> + Send> {
        let layout = self.layout;
        let cursor = self
            .store
            .find(&layout.translate_query(filter), FindOptions::default())
            .map_err(|e| unexpected("find", e))?;
        Ok(cursor.map(move |doc| {
            doc.map_err(|e| unexpected("find", e))
                .and_then(|doc| layout.decode(&doc))
        }))
    }

    pub(crate) fn read(&self, filter: &Document) -> SlotResult<Option<Record>> {
        self.read_stored(&self.layout.translate_query(filter))
    }

    /// Read by an already translated filter
    pub(crate) fn read_stored(&self, stored_filter: &Document) -> SlotResult<Option<Record>> {
        self.store
            .find_one(stored_filter)
            .map_err(|e| unexpected("find_one", e))?
            .map(|doc| self.layout.decode(&doc))
            .transpose()
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert a new value
    ///
    /// # Errors
    ///
    /// Fails with `INVALID_VALUE` if `value` is not an object, and with
    /// `UNEXPECTED_ERROR` if the store rejects it (including a duplicate `_id`).
    pub fn insert_one(&self, value: Value, options: InsertOptions) -> SlotResult<WriteResult> {
        Ok(self.insert_one_record(value, options)?.result)
    }

    /// Insert a new value and return its envelope
    ///
    /// # Errors
    ///
    /// See [`Collection::insert_one`].
    pub fn insert_one_record(&self, value: Value, options: InsertOptions) -> SlotResult<Mutation> {
        validate_value(&value, "Inserted value")?;
        let record = self.new_record(value, options.metadata.unwrap_or_default())?;

        let result = self
            .store
            .insert_one(self.layout.encode(&record))
            .map_err(|e| unexpected("insert_one", e))?;
        debug!(target: "slotdb::occ", id = ?record.id, version = record.version.as_str(), "Inserted");

        Ok(Mutation {
            record: Some(record),
            result,
        })
    }

    /// Build the first envelope for a value, assigning `_id` when missing
    pub(crate) fn new_record(&self, value: Value, metadata: Document) -> SlotResult<Record> {
        let mut fields = value
            .into_object()
            .ok_or_else(|| SlotError::invalid_value("Value must be an object"))?;
        if self.layout == Layout::Embedded {
            guard::reject_reserved(&fields)?;
        }
        let id = fields
            .entry(ID_FIELD.to_string())
            .or_insert_with(|| Value::Id(ObjectId::new()))
            .clone();

        let now = self.clock.now();
        let mut record = Record {
            id,
            value: Value::Object(fields),
            created_at: now,
            updated_at: now,
            version: self.versions.next_version(),
            metadata,
        };
        self.layout.attach_bookkeeping(&mut record);
        Ok(record)
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Create a secondary index on logical field paths
    ///
    /// Keys are translated to stored field names; values (directions) pass
    /// through.
    ///
    /// # Errors
    ///
    /// Returns `UNEXPECTED_ERROR` if the store does not support indexes or
    /// existing documents violate a unique index.
    pub fn create_index(&self, keys: &Document, unique: bool) -> SlotResult<()> {
        self.store
            .create_index(
                &self.layout.translate_index_keys(keys),
                IndexOptions { unique },
            )
            .map_err(|e| unexpected("create_index", e))
    }
}

/// `{ _id: id }`
pub(crate) fn id_filter(id: &Value) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD.to_string(), id.clone());
    filter
}

/// Render a logical filter for error messages
pub(crate) fn render(filter: &Document) -> String {
    serde_json::Value::from(Value::Object(filter.clone())).to_string()
}

fn no_such_entity(filter: &Document) -> SlotError {
    SlotError::NoSuchEntity {
        filter: render(filter),
    }
}

/// Wrap a store failure that is not a conflict signal
pub(crate) fn unexpected(operation: &str, error: StoreError) -> SlotError {
    warn!(target: "slotdb::occ", operation, error = %error, "Store error");
    SlotError::unexpected(format!("{} failed", operation), error)
}
