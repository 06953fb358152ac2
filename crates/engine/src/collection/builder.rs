//! Collection builder for fluent configuration

use std::path::Path;
use std::sync::Arc;

use slotdb_concurrency::RetryPolicy;
use slotdb_core::{Layout, SlotResult};
use slotdb_storage::DocumentStore;
use tracing::info;

use super::config::CollectionConfig;
use super::Collection;
use crate::clock::{Clock, SystemClock};
use crate::versions::{RandomVersions, VersionGenerator};

/// Builder for [`Collection`]
///
/// Time, version tokens and the default retry policy are injected here;
/// nothing in the engine reaches for them globally.
///
/// ```ignore
/// let collection = Collection::builder(MemoryStore::new())
///     .layout(Layout::Embedded)
///     .clock(ManualClock::at_millis(0))
///     .versions(CounterVersions::new())
///     .retry(FixedDelay::immediate(5))
///     .build();
/// ```
pub struct CollectionBuilder<S> {
    store: S,
    config: CollectionConfig,
    clock: Arc<dyn Clock>,
    versions: Arc<dyn VersionGenerator>,
    retry: Option<Arc<dyn RetryPolicy>>,
}

impl<S: DocumentStore> CollectionBuilder<S> {
    /// Builder with default configuration
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: CollectionConfig::default(),
            clock: Arc::new(SystemClock),
            versions: Arc::new(RandomVersions),
            retry: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn config_file(self, path: &Path) -> SlotResult<Self> {
        let config = CollectionConfig::from_file(path)?;
        info!(
            target: "slotdb::occ",
            path = %path.display(),
            layout = ?config.layout,
            max_attempts = config.retry.max_attempts,
            "Loaded collection config"
        );
        Ok(self.config(config))
    }

    /// Stored document layout
    pub fn layout(mut self, layout: Layout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Fail `find_one` on a miss instead of returning nothing
    pub fn strict_reads(mut self, strict: bool) -> Self {
        self.config.strict_reads = strict;
        self
    }

    /// Time source
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Shared time source
    pub fn shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Version token source
    pub fn versions(mut self, versions: impl VersionGenerator + 'static) -> Self {
        self.versions = Arc::new(versions);
        self
    }

    /// Default retry policy; overrides the `[retry]` config section
    pub fn retry(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Some(Arc::new(policy));
        self
    }

    /// Finish building
    pub fn build(self) -> Collection<S> {
        let retry = self
            .retry
            .unwrap_or_else(|| self.config.retry_policy());
        Collection {
            store: self.store,
            layout: self.config.layout,
            strict_reads: self.config.strict_reads,
            clock: self.clock,
            versions: self.versions,
            retry,
        }
    }
}
