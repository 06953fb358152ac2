//! Error types for slotdb
//!
//! This module defines the user-facing error type. Every variant maps to a
//! stable machine code through [`SlotError::code`]; callers match on the code
//! when they only care about the class of failure.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::version::VersionTokenError;
use std::fmt;
use thiserror::Error;

/// Result type alias for slotdb operations
pub type SlotResult<T> = std::result::Result<T, SlotError>;

/// Boxed error carried as a cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Malformed input to insert or transform output
    InvalidValue,
    /// Identity or protected-field mutation attempt
    InvalidUpdate,
    /// Malformed expected-version token
    InvalidVersion,
    /// Current version not in the caller's expected set
    VersionAssertionFailed,
    /// Strict read found nothing
    NoSuchEntity,
    /// Conflict loop exceeded the retry policy
    ExhaustedRetries,
    /// Store error that is neither "no match" nor "duplicate identifier"
    UnexpectedError,
    /// Caller transform failed
    TransformFailed,
    /// Configuration could not be loaded
    InvalidConfig,
}

impl ErrorCode {
    /// Uppercase code string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::InvalidUpdate => "INVALID_UPDATE",
            ErrorCode::InvalidVersion => "INVALID_VERSION",
            ErrorCode::VersionAssertionFailed => "VERSION_ASSERTION_FAILED",
            ErrorCode::NoSuchEntity => "NO_SUCH_ENTITY",
            ErrorCode::ExhaustedRetries => "EXHAUSTED_RETRIES",
            ErrorCode::UnexpectedError => "UNEXPECTED_ERROR",
            ErrorCode::TransformFailed => "TRANSFORM_FAILED",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for slotdb operations
#[derive(Debug, Error)]
pub enum SlotError {
    /// Value is not a structured, non-array, non-null object
    #[error("Invalid value: {reason}")]
    InvalidValue {
        /// What was wrong with it
        reason: String,
    },

    /// Transform tried to change the identifier or a bookkeeping field
    #[error("Invalid update: {reason}")]
    InvalidUpdate {
        /// What was changed
        reason: String,
    },

    /// Malformed expected-version token
    #[error("Invalid version {token:?}: {source}")]
    InvalidVersion {
        /// The offending token
        token: String,
        /// Why it failed validation
        #[source]
        source: VersionTokenError,
    },

    /// Current version is not one the caller expected
    #[error("Not an expected version: {actual:?}. Expected one of: {expected:?}")]
    VersionAssertionFailed {
        /// Version observed at read time (None when the record is absent)
        actual: Option<String>,
        /// Versions the caller accepts
        expected: Vec<String>,
    },

    /// Strict read found no record
    #[error("No such entity matching {filter}")]
    NoSuchEntity {
        /// Rendered filter
        filter: String,
    },

    /// Retry policy declined another attempt after a conflict
    #[error("Ran out of retries after {attempts} attempts updating by query {filter}")]
    ExhaustedRetries {
        /// Attempts made
        attempts: usize,
        /// Rendered filter
        filter: String,
    },

    /// Store failure that is not a conflict signal
    #[error("Unexpected error: {context}")]
    Unexpected {
        /// Which operation failed
        context: String,
        /// Original store error
        #[source]
        source: BoxError,
    },

    /// Stored document does not have the expected envelope shape
    #[error("Malformed stored document: {reason}")]
    MalformedDocument {
        /// What was missing or mistyped
        reason: String,
    },

    /// Caller transform returned an error
    #[error("Transform failed: {0}")]
    Transform(#[source] BoxError),

    /// Configuration error
    #[error("Invalid config: {reason}")]
    InvalidConfig {
        /// What was wrong
        reason: String,
    },
}

impl SlotError {
    /// Machine code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            SlotError::InvalidValue { .. } => ErrorCode::InvalidValue,
            SlotError::InvalidUpdate { .. } => ErrorCode::InvalidUpdate,
            SlotError::InvalidVersion { .. } => ErrorCode::InvalidVersion,
            SlotError::VersionAssertionFailed { .. } => ErrorCode::VersionAssertionFailed,
            SlotError::NoSuchEntity { .. } => ErrorCode::NoSuchEntity,
            SlotError::ExhaustedRetries { .. } => ErrorCode::ExhaustedRetries,
            SlotError::Unexpected { .. } | SlotError::MalformedDocument { .. } => {
                ErrorCode::UnexpectedError
            }
            SlotError::Transform(_) => ErrorCode::TransformFailed,
            SlotError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// Build an `InvalidValue` error
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        SlotError::InvalidValue {
            reason: reason.into(),
        }
    }

    /// Build an `InvalidUpdate` error
    pub fn invalid_update(reason: impl Into<String>) -> Self {
        SlotError::InvalidUpdate {
            reason: reason.into(),
        }
    }

    /// Build a `MalformedDocument` error
    pub fn malformed(reason: impl Into<String>) -> Self {
        SlotError::MalformedDocument {
            reason: reason.into(),
        }
    }

    /// Wrap a store error as `Unexpected`
    pub fn unexpected(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SlotError::Unexpected {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a caller error raised inside a transform
    pub fn transform(source: impl Into<BoxError>) -> Self {
        SlotError::Transform(source.into())
    }

    /// Check if the conflict loop gave up
    pub fn is_conflict_exhausted(&self) -> bool {
        matches!(self, SlotError::ExhaustedRetries { .. })
    }

    /// Check if this is an input validation failure (never retried)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SlotError::InvalidValue { .. }
                | SlotError::InvalidUpdate { .. }
                | SlotError::InvalidVersion { .. }
                | SlotError::VersionAssertionFailed { .. }
        )
    }
}
