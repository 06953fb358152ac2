//! OCC engine for slotdb
//!
//! This crate puts versioned records on top of any document store:
//! - Collection: insert, find, update, delete through the conflict loop
//! - CollectionBuilder / CollectionConfig: layout, retry and read settings
//! - Clock / VersionGenerator: injected time and version token sources
//!
//! The engine holds no locks. Every coordination point is a conditional
//! write in the store, filtered on the version observed at read time.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod collection;
pub mod versions;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collection::config::{CollectionConfig, RetryConfig, CONFIG_FILE_NAME};
pub use collection::options::{ConfirmDelete, DeleteOptions, InsertOptions, UpdateOptions};
pub use collection::{Collection, CollectionBuilder, Mutation, Outcome};
pub use versions::{CounterVersions, RandomVersions, VersionGenerator};
