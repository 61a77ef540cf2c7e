//! # prettysql-common
//!
//! Common types, constants, and configuration shared by the prettysql crates.
//!
//! This crate provides the foundational pieces used by the client layer and
//! by every driver:
//!
//! - **Types**: the dynamically-typed cell [`Value`] and the fixed-point
//!   [`Decimal`]
//! - **Config**: [`ClientConfig`], loadable from TOML
//! - **Constants**: defaults and limits
//!
//! ## Example
//!
//! ```rust
//! use prettysql_common::{ClientConfig, Value};
//!
//! let config = ClientConfig::default();
//! assert_eq!(config.max_live_queries, 16);
//!
//! let year: Value = 2002i16.into();
//! assert_eq!(year.type_name(), "SMALLINT");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod constants;
pub mod types;

pub use config::ClientConfig;
pub use constants::*;
pub use types::{Decimal, Value};
