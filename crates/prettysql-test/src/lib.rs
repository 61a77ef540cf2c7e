//! # prettysql-test
//!
//! Integration tests for prettysql.
//!
//! This crate contains:
//! - The films fixture: an on-disk SQLite database shared by every session
//!   a test opens
//! - End-to-end tests for named queries, sessions and transactions under
//!   `tests/`

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;

// Re-exports
pub use utils::{init_tracing, Film, FilmsDb, FILMS};
