//! Store adapter layer for slotdb
//!
//! This crate defines what the OCC engine needs from a document store and
//! ships a reference implementation:
//! - DocumentStore: point-read, find, insert, conditional replace, delete, optional indexes
//! - WriteResult: raw per-operation counts passed through to callers
//! - StoreError: adapter errors, with duplicate-key as the one recoverable signal
//! - MemoryStore: `parking_lot::RwLock` backed store with filter matching and unique indexes
//! - testing::FaultyStore: fault injection for exercising unexpected store failures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod matcher;
pub mod memory;
pub mod result;
pub mod testing;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, ID_INDEX};
pub use result::WriteResult;
pub use traits::{DocumentCursor, DocumentStore, FindOptions, IndexOptions, ReplaceOptions};
