//! Codec Integration Tests
//!
//! Property tests for the field codec: escaping is a bijection on keys, and
//! every storable value survives encode/decode through both layouts.

#[path = "../common/mod.rs"]
mod common;

mod roundtrip;
