//! Collection configuration via `slotdb.toml`
//!
//! A collection can be opened from a small TOML file. Missing keys fall back
//! to defaults, so an empty file is a valid configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotdb_concurrency::{FixedDelay, RetryPolicy, DEFAULT_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use slotdb_core::{Layout, SlotError, SlotResult};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "slotdb.toml";

/// Settings for the default fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Delay between attempts in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl RetryConfig {
    /// Build the fixed-delay policy these settings describe
    pub fn to_policy(&self) -> FixedDelay {
        FixedDelay::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

/// Collection configuration loaded from `slotdb.toml`
///
/// # Example
///
/// ```toml
/// layout = "segregated"
/// strict_reads = false
///
/// [retry]
/// max_attempts = 3
/// delay_ms = 200
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Stored document layout
    #[serde(default)]
    pub layout: Layout,
    /// Default retry policy settings
    #[serde(default)]
    pub retry: RetryConfig,
    /// Fail `find_one` with `NO_SUCH_ENTITY` instead of returning nothing
    #[serde(default)]
    pub strict_reads: bool,
}

impl CollectionConfig {
    /// Default retry policy as a shareable trait object
    pub fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        Arc::new(self.retry.to_policy())
    }

    /// Reject settings that parse but cannot work
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when `retry.max_attempts` is zero.
    pub fn validate(&self) -> SlotResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(SlotError::InvalidConfig {
                reason: "retry.max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# slotdb collection configuration
#
# Stored document layout: "segregated" (default) or "embedded"
#   "segregated" = value fields under v_, metadata under m_
#   "embedded"   = value fields unprefixed, bookkeeping in _createdAt,
#                  _updatedAt, _version and _metadata
layout = "segregated"

# Fail find_one with NO_SUCH_ENTITY when nothing matches (default: false)
strict_reads = false

# Default retry policy after a write conflict
[retry]
max_attempts = 3     # total attempts, the first one included
delay_ms = 200       # sleep between attempts
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> SlotResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SlotError::unexpected(
                format!("Failed to read config file '{}'", path.display()),
                e,
            )
        })?;
        let config: CollectionConfig =
            toml::from_str(&content).map_err(|e| SlotError::InvalidConfig {
                reason: format!("Failed to parse config file '{}': {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> SlotResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                SlotError::unexpected(
                    format!("Failed to write default config file '{}'", path.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> SlotResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| SlotError::InvalidConfig {
            reason: format!("Failed to serialize config: {}", e),
        })?;
        std::fs::write(path, content).map_err(|e| {
            SlotError::unexpected(
                format!("Failed to write config file '{}'", path.display()),
                e,
            )
        })
    }
}
