//! Version tokens
//!
//! A version token is an opaque, comparison-only string that identifies one
//! state of one record. A fresh token is generated for every accepted write and
//! the store accepts a replace or delete only while the writer's token still
//! matches the stored one.
//!
//! ## Validation
//!
//! Tokens must:
//! - Be 1-64 characters
//! - Contain only `[A-Za-z0-9_-]` (the URL-safe base64 alphabet)
//!
//! Validation applies to tokens supplied by callers as expected versions.
//! Tokens read back from the store are taken as-is.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a version token
pub const MAX_VERSION_TOKEN_LENGTH: usize = 64;

/// Number of random bytes in a generated token
pub const RANDOM_TOKEN_BYTES: usize = 8;

/// Opaque per-write version token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionToken(String);

/// Error when validating a version token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionTokenError {
    /// Token is empty
    Empty,
    /// Token exceeds maximum length
    TooLong {
        /// Actual length of the token
        length: usize,
        /// Maximum allowed length
        max: usize,
    },
    /// Token contains invalid character
    InvalidChar {
        /// The invalid character
        char: char,
        /// Position of the invalid character
        position: usize,
    },
}

impl fmt::Display for VersionTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionTokenError::Empty => write!(f, "version token cannot be empty"),
            VersionTokenError::TooLong { length, max } => {
                write!(f, "version token too long: {} chars (max {})", length, max)
            }
            VersionTokenError::InvalidChar { char, position } => write!(
                f,
                "invalid character '{}' at position {} in version token",
                char, position
            ),
        }
    }
}

impl std::error::Error for VersionTokenError {}

impl VersionToken {
    /// Parse a caller-supplied token, validating it
    pub fn parse(token: impl Into<String>) -> Result<Self, VersionTokenError> {
        let token = token.into();
        Self::validate(&token)?;
        Ok(VersionToken(token))
    }

    /// Wrap a token read from storage without validation
    pub fn new_unchecked(token: impl Into<String>) -> Self {
        VersionToken(token.into())
    }

    /// Generate a random token: 8 bytes, URL-safe base64 without padding
    pub fn random() -> Self {
        let mut bytes = [0u8; RANDOM_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        VersionToken(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Validate a token string
    pub fn validate(token: &str) -> Result<(), VersionTokenError> {
        if token.is_empty() {
            return Err(VersionTokenError::Empty);
        }

        let length = token.chars().count();
        if length > MAX_VERSION_TOKEN_LENGTH {
            return Err(VersionTokenError::TooLong {
                length,
                max: MAX_VERSION_TOKEN_LENGTH,
            });
        }

        for (position, ch) in token.chars().enumerate() {
            if !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
                return Err(VersionTokenError::InvalidChar { char: ch, position });
            }
        }

        Ok(())
    }

    /// Get the token as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for VersionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
