//! # prettysql-client
//!
//! A thin convenience layer over SQL drivers.
//!
//! This crate turns a driver [`Connection`](driver::Connection) into a
//! friendlier programming surface. It includes:
//!
//! - **Named Parameters**: write `:name` or `:{name}` instead of `?`
//! - **Cached Results**: fully materialized results with a free cursor
//! - **Result Mapping**: map rows to values with closures or column mappers
//! - **Sessions**: one connection, a bounded set of live queries and the
//!   current transaction
//! - **Transactions**: explicit begin/commit/rollback that restore the
//!   connection's settings afterwards
//!
//! ## Quick Start
//!
//! ```rust
//! use prettysql_client::driver::memory::{MemoryDataSource, ResultFixture};
//! use prettysql_client::{CachedScrollableResult, ClientResult, SessionFactory};
//! use prettysql_common::Value;
//!
//! fn main() -> ClientResult<()> {
//!     let source = MemoryDataSource::new().with_result(
//!         "SELECT id, original_name FROM films WHERE year >= ?",
//!         ResultFixture::new(["id", "original_name"])
//!             .row(vec![Value::Int(2), Value::from("The Two Towers")]),
//!     );
//!     let factory = SessionFactory::new(source);
//!
//!     let mut session = factory.open_session()?;
//!     let mut query = session
//!         .create_named_query("SELECT id, original_name FROM films WHERE year >= :year")?;
//!     query.set_named("year", 2002i16)?;
//!
//!     let mut result = query.execute()?;
//!     while result.next() {
//!         let name: Option<String> = result.get_by_name("original_name")?;
//!         println!("{:?}", name);
//!     }
//!
//!     // Map rows instead of walking the cursor
//!     let names = query.with_mapper(|row: &CachedScrollableResult| {
//!         row.get_by_name::<String>("original_name")
//!     });
//!     assert_eq!(names.list()?, vec![Some("The Two Towers".to_string())]);
//!
//!     // Commit on success, roll back on error
//!     session.do_in_transaction(|s| {
//!         s.create_query("UPDATE films SET year = year")?.execute_update()
//!     })?;
//!
//!     session.close()
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;

/// Driver abstraction.
pub mod driver;

/// Named-parameter processing.
pub mod params;

/// Cached scrollable results.
pub mod result;

/// Result mappers.
pub mod mapper;

/// Query handles.
pub mod query;

/// Transaction handle.
pub mod transaction;

/// Bounded query registry.
pub mod registry;

/// Sessions.
pub mod session;

/// Session factory and context.
pub mod factory;

// Re-exports
pub use driver::{Connection, DataSource, RowStream, Statement};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use factory::{SessionContext, SessionFactory};
pub use mapper::{first_column, ResultMapper};
pub use params::{NamedQueryPlan, ParameterTable};
pub use query::{Query, QueryId};
pub use result::{CachedScrollableResult, FromValue};
pub use session::{Session, SessionId};
pub use transaction::{IsolationLevel, Transaction, TransactionId, TransactionStatus};
