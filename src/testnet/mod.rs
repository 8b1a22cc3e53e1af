//! Test fixtures
//!
//! Helpers for building chains, forks and small in-memory networks in tests.

pub mod test_utils;

pub use test_utils::*;
