//! Testing utilities for store adapters
//!
//! - **FaultyStore**: wraps any [`DocumentStore`](crate::DocumentStore) and
//!   injects errors per operation while counting calls
//!
//! # Example
//!
//! ```
//! use slotdb_storage::testing::{FaultyStore, StoreOp};
//! use slotdb_storage::{MemoryStore, StoreError};
//!
//! let store = FaultyStore::new(MemoryStore::new());
//! store.fail_next(StoreOp::ReplaceOne, StoreError::Backend("boom".into()));
//! assert_eq!(store.calls(StoreOp::ReplaceOne), 0);
//! ```

mod faulty;

pub use faulty::{FaultyStore, StoreOp};
