//! Fault injection wrapper
//!
//! [`FaultyStore`] forwards every call to an inner store unless a fault is
//! armed for that operation. Faults are either one-shot (`fail_next`) or
//! sticky (`fail_always`). Armed faults fire before the inner store is
//! touched, so a failed write never lands.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use slotdb_core::Document;

use crate::error::{StoreError, StoreResult};
use crate::result::WriteResult;
use crate::traits::{DocumentCursor, DocumentStore, FindOptions, IndexOptions, ReplaceOptions};

/// Store operations that can be counted and failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `find_one`
    FindOne,
    /// `find`
    Find,
    /// `insert_one`
    InsertOne,
    /// `replace_one`
    ReplaceOne,
    /// `delete_one`
    DeleteOne,
    /// `create_index`
    CreateIndex,
}

impl StoreOp {
    const ALL: [StoreOp; 6] = [
        StoreOp::FindOne,
        StoreOp::Find,
        StoreOp::InsertOne,
        StoreOp::ReplaceOne,
        StoreOp::DeleteOne,
        StoreOp::CreateIndex,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone)]
struct Fault {
    error: StoreError,
    sticky: bool,
}

/// Store wrapper that injects errors and counts calls
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    faults: Mutex<HashMap<StoreOp, Fault>>,
    counters: [AtomicUsize; 6],
}

impl<S: DocumentStore> FaultyStore<S> {
    /// Wrap a store with no faults armed
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
            counters: Default::default(),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail the next call of `op` with `error`
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.faults.lock().insert(op, Fault { error, sticky: false });
    }

    /// Fail every call of `op` with `error` until cleared
    pub fn fail_always(&self, op: StoreOp, error: StoreError) {
        self.faults.lock().insert(op, Fault { error, sticky: true });
    }

    /// Disarm every fault
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Number of calls made to `op` (failed calls included)
    pub fn calls(&self, op: StoreOp) -> usize {
        self.counters[op.slot()].load(Ordering::SeqCst)
    }

    /// Number of calls across every operation
    pub fn total_calls(&self) -> usize {
        StoreOp::ALL.iter().map(|op| self.calls(*op)).sum()
    }

    fn enter(&self, op: StoreOp) -> StoreResult<()> {
        self.counters[op.slot()].fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock();
        let sticky = match faults.get(&op) {
            Some(fault) => fault.sticky,
            None => return Ok(()),
        };
        if sticky {
            Err(faults[&op].error.clone())
        } else {
            faults.remove(&op).map_or(Ok(()), |fault| Err(fault.error))
        }
    }
}

impl<S: DocumentStore> DocumentStore for FaultyStore<S> {
    fn find_one(&self, filter: &Document) -> StoreResult<Option<Document>> {
        self.enter(StoreOp::FindOne)?;
        self.inner.find_one(filter)
    }

    fn find(&self, filter: &Document, options: FindOptions) -> StoreResult<DocumentCursor> {
        self.enter(StoreOp::Find)?;
        self.inner.find(filter, options)
    }

    fn insert_one(&self, document: Document) -> StoreResult<WriteResult> {
        self.enter(StoreOp::InsertOne)?;
        self.inner.insert_one(document)
    }

    fn replace_one(
        &self,
        filter: &Document,
        replacement: Document,
        options: ReplaceOptions,
    ) -> StoreResult<WriteResult> {
        self.enter(StoreOp::ReplaceOne)?;
        self.inner.replace_one(filter, replacement, options)
    }

    fn delete_one(&self, filter: &Document) -> StoreResult<WriteResult> {
        self.enter(StoreOp::DeleteOne)?;
        self.inner.delete_one(filter)
    }

    fn create_index(&self, keys: &Document, options: IndexOptions) -> StoreResult<()> {
        self.enter(StoreOp::CreateIndex)?;
        self.inner.create_index(keys, options)
    }
}
