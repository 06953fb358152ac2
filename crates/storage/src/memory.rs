//! MemoryStore: in-process reference document store
//!
//! Implements [`DocumentStore`] over a `Vec<Document>` behind a
//! `parking_lot::RwLock`. Every write takes the write lock for its whole
//! match-and-modify step, which gives the single-document atomicity the OCC
//! engine relies on.
//!
//! # Design Notes
//!
//! - **Insertion order**: documents are kept in insertion order, so `find`
//!   and `find_one` return the first match in that order
//! - **Unique indexes**: `_id` is always unique; `create_index` with
//!   `unique` adds more. A missing indexed field counts as `null`.
//! - **Cheap clones**: `MemoryStore` is a handle; clones share the same data

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use slotdb_core::path::get_path;
use slotdb_core::{Document, ObjectId, Value, ID_FIELD};

use crate::error::{StoreError, StoreResult};
use crate::matcher::matches;
use crate::result::WriteResult;
use crate::traits::{DocumentCursor, DocumentStore, FindOptions, IndexOptions, ReplaceOptions};

/// Name of the implicit unique index on `_id`
pub const ID_INDEX: &str = "_id_";

#[derive(Debug, Clone)]
struct UniqueIndex {
    name: String,
    fields: Vec<String>,
}

impl UniqueIndex {
    fn key_of(&self, doc: &Document) -> Vec<Value> {
        self.fields
            .iter()
            .map(|f| get_path(doc, f).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

#[derive(Debug, Default)]
struct Inner {
    docs: Vec<Document>,
    unique: Vec<UniqueIndex>,
    indexes: Vec<String>,
}

impl Inner {
    fn first_match(&self, filter: &Document) -> StoreResult<Option<usize>> {
        for (pos, doc) in self.docs.iter().enumerate() {
            if matches(doc, filter)? {
                return Ok(Some(pos));
            }
        }
        Ok(None)
    }

    /// Check `candidate` against `_id` and every unique index, ignoring the
    /// document at `skip` (the one being replaced).
    fn check_unique(&self, candidate: &Document, skip: Option<usize>) -> StoreResult<()> {
        let id = candidate.get(ID_FIELD);
        for (pos, doc) in self.docs.iter().enumerate() {
            if Some(pos) == skip {
                continue;
            }
            if id.is_some() && doc.get(ID_FIELD) == id {
                return Err(duplicate(ID_INDEX, id.unwrap_or(&Value::Null)));
            }
            for index in &self.unique {
                let key = index.key_of(candidate);
                if index.key_of(doc) == key {
                    return Err(duplicate(&index.name, &Value::Array(key)));
                }
            }
        }
        Ok(())
    }
}

fn duplicate(index: &str, key: &Value) -> StoreError {
    debug!(target: "slotdb::store", index, ?key, "Duplicate key rejected");
    StoreError::DuplicateKey {
        index: index.to_string(),
        key: format!("{:?}", key),
    }
}

fn index_name(keys: &Document) -> String {
    let mut parts: Vec<String> = keys
        .iter()
        .map(|(k, v)| match v {
            Value::Int(i) => format!("{}_{}", k, i),
            Value::String(s) => format!("{}_{}", k, s),
            _ => k.clone(),
        })
        .collect();
    parts.sort();
    parts.join("_")
}

/// In-memory document store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.inner.read().docs.len()
    }

    /// Check if the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.inner.read().docs.is_empty()
    }

    /// Snapshot of every stored document, in insertion order
    pub fn documents(&self) -> Vec<Document> {
        self.inner.read().docs.clone()
    }

    /// Names of the indexes created so far (the `_id` index excluded)
    pub fn index_names(&self) -> Vec<String> {
        self.inner.read().indexes.clone()
    }
}

impl DocumentStore for MemoryStore {
    fn find_one(&self, filter: &Document) -> StoreResult<Option<Document>> {
        let inner = self.inner.read();
        Ok(inner.first_match(filter)?.map(|pos| inner.docs[pos].clone()))
    }

    fn find(&self, filter: &Document, options: FindOptions) -> StoreResult<DocumentCursor> {
        let inner = self.inner.read();
        let mut hits = Vec::new();
        for doc in &inner.docs {
            if matches(doc, filter)? {
                hits.push(doc.clone());
            }
        }
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(Box::new(
            hits.into_iter().skip(options.skip).take(limit).map(Ok),
        ))
    }

    fn insert_one(&self, mut document: Document) -> StoreResult<WriteResult> {
        if !document.contains_key(ID_FIELD) {
            document.insert(ID_FIELD.to_string(), Value::Id(ObjectId::new()));
        }
        let id = document.get(ID_FIELD).cloned().unwrap_or(Value::Null);

        let mut inner = self.inner.write();
        inner.check_unique(&document, None)?;
        inner.docs.push(document);
        trace!(target: "slotdb::store", ?id, "Inserted document");
        Ok(WriteResult::inserted(id))
    }

    fn replace_one(
        &self,
        filter: &Document,
        mut replacement: Document,
        options: ReplaceOptions,
    ) -> StoreResult<WriteResult> {
        let mut inner = self.inner.write();

        match inner.first_match(filter)? {
            Some(pos) => {
                let existing_id = inner.docs[pos].get(ID_FIELD).cloned();
                match (replacement.get(ID_FIELD), &existing_id) {
                    (Some(new_id), Some(old_id)) if new_id != old_id => {
                        return Err(StoreError::Backend(
                            "replacement would modify the immutable field '_id'".to_string(),
                        ));
                    }
                    (None, Some(old_id)) => {
                        replacement.insert(ID_FIELD.to_string(), old_id.clone());
                    }
                    _ => {}
                }
                inner.check_unique(&replacement, Some(pos))?;
                let modified = inner.docs[pos] != replacement;
                inner.docs[pos] = replacement;
                Ok(WriteResult::replaced(1, u64::from(modified)))
            }
            None if options.upsert => {
                if !replacement.contains_key(ID_FIELD) {
                    let id = match filter.get(ID_FIELD) {
                        Some(v) if !v.is_object() => v.clone(),
                        _ => Value::Id(ObjectId::new()),
                    };
                    replacement.insert(ID_FIELD.to_string(), id);
                }
                let id = replacement.get(ID_FIELD).cloned().unwrap_or(Value::Null);
                inner.check_unique(&replacement, None)?;
                inner.docs.push(replacement);
                Ok(WriteResult::upserted(id))
            }
            None => Ok(WriteResult::replaced(0, 0)),
        }
    }

    fn delete_one(&self, filter: &Document) -> StoreResult<WriteResult> {
        let mut inner = self.inner.write();
        match inner.first_match(filter)? {
            Some(pos) => {
                inner.docs.remove(pos);
                Ok(WriteResult::deleted(1))
            }
            None => Ok(WriteResult::deleted(0)),
        }
    }

    fn create_index(&self, keys: &Document, options: IndexOptions) -> StoreResult<()> {
        let name = index_name(keys);
        let mut inner = self.inner.write();
        if inner.indexes.contains(&name) {
            return Ok(());
        }

        if options.unique {
            if keys.keys().any(|k| k.starts_with('$')) {
                return Err(StoreError::Unsupported(
                    "unique wildcard index".to_string(),
                ));
            }
            let mut fields: Vec<String> = keys.keys().cloned().collect();
            fields.sort();
            let index = UniqueIndex {
                name: name.clone(),
                fields,
            };
            let mut seen: Vec<Vec<Value>> = Vec::with_capacity(inner.docs.len());
            for doc in &inner.docs {
                let key = index.key_of(doc);
                if seen.contains(&key) {
                    return Err(duplicate(&name, &Value::Array(key)));
                }
                seen.push(key);
            }
            inner.unique.push(index);
        }

        debug!(target: "slotdb::store", index = %name, unique = options.unique, "Created index");
        inner.indexes.push(name);
        Ok(())
    }
}
