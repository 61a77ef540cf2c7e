//! # prettysql-sqlite
//!
//! SQLite driver for prettysql, built on `rusqlite`.
//!
//! ```rust
//! use prettysql_client::{ClientResult, SessionFactory};
//! use prettysql_sqlite::SqliteDataSource;
//!
//! fn main() -> ClientResult<()> {
//!     let factory = SessionFactory::new(SqliteDataSource::memory());
//!     let mut session = factory.open_session()?;
//!
//!     session
//!         .create_query("CREATE TABLE films (id INTEGER, year SMALLINT)")?
//!         .execute_update()?;
//!
//!     let mut insert = session.create_named_query("INSERT INTO films VALUES (:id, :year)")?;
//!     insert.set_named("id", 1)?;
//!     insert.set_named("year", 2001i16)?;
//!     assert_eq!(insert.execute_update()?, 1);
//!
//!     session.close()
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod connection;
mod statement;

/// Value conversions.
pub mod types;

// Re-exports
pub use connection::{SqliteConnection, SqliteDataSource, DEFAULT_BUSY_TIMEOUT};
