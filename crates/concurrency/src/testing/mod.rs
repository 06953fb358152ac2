//! Testing utilities for optimistic concurrency
//!
//! - **run_interleaved**: deterministic rendezvous that forces other writers in
//!   between a primary operation's read and write
//!
//! # Example
//!
//! ```ignore
//! use slotdb_concurrency::testing::run_interleaved;
//!
//! let out = run_interleaved(
//!     |gate| collection.update_by_id(&id, |v, _| gate.around(|| bump(v)), opts),
//!     vec![|| collection.update_by_id(&id, |v, _| other(v), opts)],
//! );
//! assert_eq!(out.interleaved, 1);
//! ```

mod interleave;

pub use interleave::{run_interleaved, Interleaved, Phase, PrimaryGate, Signal};
