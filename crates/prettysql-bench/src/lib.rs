//! prettysql Performance Benchmarks
//!
//! This crate contains benchmarks for:
//! - Named-parameter processing
//! - Cached result materialization and navigation
//! - The bounded query registry
//! - End-to-end queries through the SQLite driver
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p prettysql-bench
//! ```

pub mod utils;
