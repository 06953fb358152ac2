//! Optimistic read-modify-write
//!
//! Every update and delete runs the same loop:
//!
//! ```text
//! READ -> TRANSFORM -> WRITE -> ACCEPTED
//!                        |
//!                        +-> CONFLICT -> READ (policy allows)
//!                                     -> EXHAUSTED
//! ```
//!
//! WRITE is always conditional. A replace or delete is filtered on
//! `{ _id, version }` as observed at READ, so zero matches means another
//! writer got there first. An upsert inserts, and a duplicate `_id` means the
//! same thing. Both are CONFLICT; every other store error is fatal.
//!
//! Validation failures, version assertion failures and transform errors are
//! never retried.

use std::sync::Arc;

use slotdb_concurrency::RetryPolicy;
use slotdb_core::{
    project_upsert_default, validate_value, Document, Layout, Metadata, ObjectId, Record,
    SlotError, SlotResult, Timestamp, Value, VersionToken, ID_FIELD,
};
use slotdb_storage::{DocumentStore, ReplaceOptions, WriteResult};
use tracing::{debug, warn};

use super::options::{parse_expected, DeleteOptions, UpdateOptions};
use super::{guard, id_filter, render, unexpected, Collection};

/// What a transform wants done with the record it was shown
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Replace the value, keeping the current metadata
    Put(Value),
    /// Replace the value and the metadata
    PutWithMetadata(Value, Metadata),
    /// Remove the record
    Delete,
    /// Leave everything as it is; no write is issued
    Keep,
}

/// Result of an accepted mutation
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Envelope after the write, the unchanged one for a no-op, the removed
    /// one for a delete, or `None` when there was nothing to act on
    pub record: Option<Record>,
    /// Raw store result
    pub result: WriteResult,
}

impl Mutation {
    fn noop(record: Option<Record>) -> Self {
        Self {
            record,
            result: WriteResult::noop(),
        }
    }
}

/// Result of one pass through the loop
enum Attempt {
    Done(Mutation),
    Conflict(&'static str),
}

impl<S: DocumentStore> Collection<S> {
    // ========================================================================
    // Update
    // ========================================================================

    /// Read-modify-write the first record matching `filter`
    ///
    /// See [`Collection::update_one_record`].
    pub fn update_one<F>(
        &self,
        filter: &Document,
        transform: F,
        options: UpdateOptions,
    ) -> SlotResult<WriteResult>
    where
        F: FnMut(Value, Option<&Record>) -> SlotResult<Outcome>,
    {
        Ok(self.update_one_record(filter, transform, options)?.result)
    }

    /// Read-modify-write the record with identifier `id`
    pub fn update_by_id<F>(
        &self,
        id: &Value,
        transform: F,
        options: UpdateOptions,
    ) -> SlotResult<Mutation>
    where
        F: FnMut(Value, Option<&Record>) -> SlotResult<Outcome>,
    {
        self.update_one_record(&id_filter(id), transform, options)
    }

    /// Read-modify-write the first record matching `filter`
    ///
    /// `transform` receives the current value and envelope. It may run more
    /// than once, each time against a fresh read. When nothing matches and
    /// `upsert` is set, it receives a value projected from the filter and no
    /// envelope. When nothing matches without `upsert`, it is not called and
    /// the result carries no record.
    ///
    /// # Errors
    ///
    /// - `INVALID_VERSION`: a malformed expected version, before any read
    /// - `VERSION_ASSERTION_FAILED`: the current version is not expected
    /// - `INVALID_VALUE`: the transform returned a non-object
    /// - `INVALID_UPDATE`: the transform changed `_id` or a protected field
    /// - `EXHAUSTED_RETRIES`: the retry policy gave up after a conflict
    /// - `UNEXPECTED_ERROR`: the store failed
    /// - any error returned by the transform, unchanged
    pub fn update_one_record<F>(
        &self,
        filter: &Document,
        mut transform: F,
        options: UpdateOptions,
    ) -> SlotResult<Mutation>
    where
        F: FnMut(Value, Option<&Record>) -> SlotResult<Outcome>,
    {
        let expected = parse_expected(options.expected_versions.as_deref())?;
        let retry = options.retry.unwrap_or_else(|| Arc::clone(&self.retry));
        let stored_filter = self.layout.translate_query(filter);
        let now = self.clock.now();

        self.run(filter, &*retry, |attempt| {
            let current = self.read_stored(&stored_filter)?;
            trace_read(attempt, current.as_ref());
            check_expected(expected.as_deref(), current.as_ref())?;

            match current {
                Some(record) => {
                    let outcome = transform(record.value.clone(), Some(&record))?;
                    self.apply(record, outcome, now)
                }
                None if options.upsert => {
                    let default = project_upsert_default(filter);
                    let projected_id = default.get(ID_FIELD).cloned();
                    let outcome = transform(default, None)?;
                    self.upsert(outcome, projected_id, now)
                }
                None => Ok(Attempt::Done(Mutation::noop(None))),
            }
        })
    }

    fn apply(&self, current: Record, outcome: Outcome, now: Timestamp) -> SlotResult<Attempt> {
        let (value, metadata) = match outcome {
            Outcome::Keep => return Ok(Attempt::Done(Mutation::noop(Some(current)))),
            Outcome::Delete => return self.delete_record(current),
            Outcome::Put(value) => (value, current.metadata.clone()),
            Outcome::PutWithMetadata(value, metadata) => (value, metadata),
        };

        let value = self.checked_value(value, &current.id, Some(&current.value))?;
        let mut next = Record {
            id: current.id.clone(),
            value,
            created_at: current.created_at,
            // A record inserted by a racing writer may be newer than `now`
            updated_at: now.max(current.updated_at),
            version: self.versions.next_version(),
            metadata,
        };

        let result = self
            .store
            .replace_one(
                &self.layout.cas_filter(&current.id, &current.version),
                self.layout.encode(&next),
                ReplaceOptions::default(),
            )
            .map_err(|e| unexpected("replace_one", e))?;
        if result.matched_count == 0 {
            return Ok(Attempt::Conflict("replace matched nothing"));
        }

        self.layout.attach_bookkeeping(&mut next);
        Ok(Attempt::Done(Mutation {
            record: Some(next),
            result,
        }))
    }

    /// Insert path; an `_id` projected from the filter is binding
    fn upsert(
        &self,
        outcome: Outcome,
        projected_id: Option<Value>,
        now: Timestamp,
    ) -> SlotResult<Attempt> {
        let (value, metadata) = match outcome {
            Outcome::Keep | Outcome::Delete => return Ok(Attempt::Done(Mutation::noop(None))),
            Outcome::Put(value) => (value, Metadata::new()),
            Outcome::PutWithMetadata(value, metadata) => (value, metadata),
        };

        let id = match (projected_id, value.get(ID_FIELD)) {
            (Some(id), _) => id,
            (None, Some(id)) => id.clone(),
            (None, None) => Value::Id(ObjectId::new()),
        };
        let value = self.checked_value(value, &id, None)?;
        let mut record = Record {
            id,
            value,
            created_at: now,
            updated_at: now,
            version: self.versions.next_version(),
            metadata,
        };

        match self.store.insert_one(self.layout.encode(&record)) {
            Ok(_) => {
                self.layout.attach_bookkeeping(&mut record);
                let result = WriteResult::upserted(record.id.clone());
                Ok(Attempt::Done(Mutation {
                    record: Some(record),
                    result,
                }))
            }
            Err(e) if e.is_duplicate_id() => Ok(Attempt::Conflict("duplicate id")),
            Err(e) => Err(unexpected("insert_one", e)),
        }
    }

    /// Validate a transform result and pin its identifier
    fn checked_value(
        &self,
        value: Value,
        id: &Value,
        previous: Option<&Value>,
    ) -> SlotResult<Value> {
        validate_value(&value, "Transform result")?;
        let mut fields = value
            .into_object()
            .ok_or_else(|| SlotError::invalid_value("Transform result must be an object"))?;

        match fields.get(ID_FIELD) {
            None => {
                fields.insert(ID_FIELD.to_string(), id.clone());
            }
            Some(returned) if returned == id => {}
            Some(returned) => {
                return Err(SlotError::invalid_update(format!(
                    "Cannot change _id from {:?} to {:?}",
                    id, returned
                )));
            }
        }

        if self.layout == Layout::Embedded {
            match previous {
                Some(previous) => guard::protect(previous, &mut fields)?,
                None => guard::reject_reserved(&fields)?,
            }
        }
        Ok(Value::Object(fields))
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete the first record matching `filter`
    ///
    /// See [`Collection::delete_one_record`].
    pub fn delete_one(&self, filter: &Document, options: DeleteOptions) -> SlotResult<WriteResult> {
        Ok(self.delete_one_record(filter, options)?.result)
    }

    /// Delete the record with identifier `id`
    pub fn delete_by_id(&self, id: &Value, options: DeleteOptions) -> SlotResult<Mutation> {
        self.delete_one_record(&id_filter(id), options)
    }

    /// Delete the first record matching `filter`, conditioned on its version
    ///
    /// When `confirm_delete` declines, no write is issued and the current
    /// record is returned with `deleted_count == 0`. When nothing matches,
    /// the result carries no record.
    ///
    /// # Errors
    ///
    /// `INVALID_VERSION`, `VERSION_ASSERTION_FAILED`, `EXHAUSTED_RETRIES` or
    /// `UNEXPECTED_ERROR`, as for updates.
    pub fn delete_one_record(
        &self,
        filter: &Document,
        options: DeleteOptions,
    ) -> SlotResult<Mutation> {
        let expected = parse_expected(options.expected_versions.as_deref())?;
        let retry = options.retry.unwrap_or_else(|| Arc::clone(&self.retry));
        let stored_filter = self.layout.translate_query(filter);

        self.run(filter, &*retry, |attempt| {
            let current = self.read_stored(&stored_filter)?;
            trace_read(attempt, current.as_ref());
            check_expected(expected.as_deref(), current.as_ref())?;

            let Some(record) = current else {
                return Ok(Attempt::Done(Mutation::noop(None)));
            };
            if let Some(confirm) = &options.confirm_delete {
                if !confirm(&record.value, &record) {
                    debug!(target: "slotdb::occ", id = ?record.id, "Delete declined");
                    return Ok(Attempt::Done(Mutation::noop(Some(record))));
                }
            }
            self.delete_record(record)
        })
    }

    fn delete_record(&self, current: Record) -> SlotResult<Attempt> {
        let result = self
            .store
            .delete_one(&self.layout.cas_filter(&current.id, &current.version))
            .map_err(|e| unexpected("delete_one", e))?;
        if result.deleted_count == 0 {
            return Ok(Attempt::Conflict("delete matched nothing"));
        }
        Ok(Attempt::Done(Mutation {
            record: Some(current),
            result,
        }))
    }

    // ========================================================================
    // Conflict loop
    // ========================================================================

    fn run<F>(
        &self,
        filter: &Document,
        retry: &dyn RetryPolicy,
        mut attempt: F,
    ) -> SlotResult<Mutation>
    where
        F: FnMut(usize) -> SlotResult<Attempt>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt(attempts)? {
                Attempt::Done(mutation) => return Ok(mutation),
                Attempt::Conflict(reason) => {
                    debug!(target: "slotdb::occ", attempts, reason, "Write conflict");
                    if !retry.should_retry(attempts) {
                        let filter = render(filter);
                        warn!(target: "slotdb::occ", attempts, filter = %filter, "Retries exhausted");
                        return Err(SlotError::ExhaustedRetries { attempts, filter });
                    }
                }
            }
        }
    }
}

fn trace_read(attempt: usize, current: Option<&Record>) {
    debug!(
        target: "slotdb::occ",
        attempt,
        version = current.map(|r| r.version.as_str()),
        "Read"
    );
}

/// Fail unless the current version is one the caller expects
fn check_expected(expected: Option<&[VersionToken]>, current: Option<&Record>) -> SlotResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = current.map(|r| &r.version);
    if actual.is_some_and(|v| expected.contains(v)) {
        return Ok(());
    }
    Err(SlotError::VersionAssertionFailed {
        actual: actual.map(|v| v.as_str().to_string()),
        expected: expected.iter().map(|v| v.as_str().to_string()).collect(),
    })
}
