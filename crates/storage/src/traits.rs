//! Store adapter abstraction
//!
//! This module defines the [`DocumentStore`] trait, the minimal capability
//! surface the OCC engine needs from a document store. Any store that can
//! point-read by filter, insert, conditionally replace and delete can back a
//! collection.

use std::sync::Arc;

use slotdb_core::Document;

use crate::error::{StoreError, StoreResult};
use crate::result::WriteResult;

/// Lazy sequence of stored documents
pub type DocumentCursor = Box<dyn Iterator<Item = StoreResult<Document>> + Send>;

/// Options for [`DocumentStore::find`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Skip this many matches
    pub skip: usize,
    /// Return at most this many matches
    pub limit: Option<usize>,
}

impl FindOptions {
    /// Set the limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the skip count
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

/// Options for [`DocumentStore::replace_one`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Insert the replacement when nothing matches
    pub upsert: bool,
}

/// Options for [`DocumentStore::create_index`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Reject documents whose indexed key collides with an existing one
    pub unique: bool,
}

/// Document store capability consumed by the OCC engine
///
/// Filters and documents use stored field names; translating logical names is
/// the engine's job.
///
/// Thread safety: all methods must be safe to call concurrently from multiple
/// threads (requires Send + Sync). Each single-document write must be atomic
/// with respect to its filter: two `replace_one` calls filtered on the same
/// `{ _id, version }` can never both match.
pub trait DocumentStore: Send + Sync {
    /// Get the first document matching `filter`
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn find_one(&self, filter: &Document) -> StoreResult<Option<Document>>;

    /// Get every document matching `filter`
    ///
    /// The cursor is finite; calling `find` again starts a fresh sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be evaluated.
    fn find(&self, filter: &Document, options: FindOptions) -> StoreResult<DocumentCursor>;

    /// Insert a document, assigning `_id` when absent
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] when `_id` or a unique index
    /// collides with an existing document.
    fn insert_one(&self, document: Document) -> StoreResult<WriteResult>;

    /// Replace the first document matching `filter`
    ///
    /// Zero `matched_count` with no upsert means nothing matched; that is a
    /// normal outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn replace_one(
        &self,
        filter: &Document,
        replacement: Document,
        options: ReplaceOptions,
    ) -> StoreResult<WriteResult>;

    /// Delete the first document matching `filter`
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn delete_one(&self, filter: &Document) -> StoreResult<WriteResult>;

    /// Create a secondary index
    ///
    /// Optional capability; the default reports it as unsupported.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unsupported`] unless the adapter overrides it.
    fn create_index(&self, keys: &Document, options: IndexOptions) -> StoreResult<()> {
        let _ = (keys, options);
        Err(StoreError::Unsupported("create_index".to_string()))
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn find_one(&self, filter: &Document) -> StoreResult<Option<Document>> {
        (**self).find_one(filter)
    }

    fn find(&self, filter: &Document, options: FindOptions) -> StoreResult<DocumentCursor> {
        (**self).find(filter, options)
    }

    fn insert_one(&self, document: Document) -> StoreResult<WriteResult> {
        (**self).insert_one(document)
    }

    fn replace_one(
        &self,
        filter: &Document,
        replacement: Document,
        options: ReplaceOptions,
    ) -> StoreResult<WriteResult> {
        (**self).replace_one(filter, replacement, options)
    }

    fn delete_one(&self, filter: &Document) -> StoreResult<WriteResult> {
        (**self).delete_one(filter)
    }

    fn create_index(&self, keys: &Document, options: IndexOptions) -> StoreResult<()> {
        (**self).create_index(keys, options)
    }
}
