//! Per-call options for collection operations

use std::fmt;
use std::sync::Arc;

use slotdb_concurrency::RetryPolicy;
use slotdb_core::{Metadata, Record, SlotError, SlotResult, Value, VersionToken};

/// Gate consulted before a delete is attempted
pub type ConfirmDelete = Arc<dyn Fn(&Value, &Record) -> bool + Send + Sync>;

/// Options for `insert_one`
#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    /// Caller metadata stored alongside the value
    pub metadata: Option<Metadata>,
}

impl InsertOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach caller metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Options for `update_one`
#[derive(Clone, Default)]
pub struct UpdateOptions {
    /// Versions the caller accepts; any other current version fails the call
    pub expected_versions: Option<Vec<String>>,
    /// Overrides the collection's retry policy for this call
    pub retry: Option<Arc<dyn RetryPolicy>>,
    /// Insert a value projected from the filter when nothing matches
    pub upsert: bool,
}

impl UpdateOptions {
    /// Default options: no version assertion, collection retry policy, no upsert
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `UpdateOptions::new().with_upsert(true)`
    pub fn upsert() -> Self {
        Self::new().with_upsert(true)
    }

    /// Enable or disable upsert
    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Require the current version to be `version`
    pub fn expect_version(self, version: impl Into<String>) -> Self {
        self.expect_versions([version])
    }

    /// Require the current version to be one of `versions`
    pub fn expect_versions<I, V>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.expected_versions
            .get_or_insert_with(Vec::new)
            .extend(versions.into_iter().map(Into::into));
        self
    }

    /// Use `policy` instead of the collection default
    pub fn with_retry(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Some(Arc::new(policy));
        self
    }
}

impl fmt::Debug for UpdateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateOptions")
            .field("expected_versions", &self.expected_versions)
            .field("retry", &self.retry.as_ref().map(|_| "custom"))
            .field("upsert", &self.upsert)
            .finish()
    }
}

/// Options for `delete_one`
#[derive(Clone, Default)]
pub struct DeleteOptions {
    /// Called with the current value and record; `false` skips the delete
    pub confirm_delete: Option<ConfirmDelete>,
    /// Versions the caller accepts; any other current version fails the call
    pub expected_versions: Option<Vec<String>>,
    /// Overrides the collection's retry policy for this call
    pub retry: Option<Arc<dyn RetryPolicy>>,
}

impl DeleteOptions {
    /// Default options: unconditional delete, collection retry policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Only delete when `confirm` approves the current state
    pub fn confirm<F>(mut self, confirm: F) -> Self
    where
        F: Fn(&Value, &Record) -> bool + Send + Sync + 'static,
    {
        self.confirm_delete = Some(Arc::new(confirm));
        self
    }

    /// Require the current version to be `version`
    pub fn expect_version(mut self, version: impl Into<String>) -> Self {
        self.expected_versions
            .get_or_insert_with(Vec::new)
            .push(version.into());
        self
    }

    /// Use `policy` instead of the collection default
    pub fn with_retry(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Some(Arc::new(policy));
        self
    }
}

impl fmt::Debug for DeleteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteOptions")
            .field("confirm_delete", &self.confirm_delete.is_some())
            .field("expected_versions", &self.expected_versions)
            .field("retry", &self.retry.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Validate caller-supplied expected versions before any read
///
/// # Errors
///
/// Returns `InvalidVersion` for the first malformed token.
pub(crate) fn parse_expected(
    versions: Option<&[String]>,
) -> SlotResult<Option<Vec<VersionToken>>> {
    let Some(versions) = versions else {
        return Ok(None);
    };
    versions
        .iter()
        .map(|token| {
            VersionToken::parse(token.clone()).map_err(|source| SlotError::InvalidVersion {
                token: token.clone(),
                source,
            })
        })
        .collect::<SlotResult<Vec<_>>>()
        .map(Some)
}
