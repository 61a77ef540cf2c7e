//! Driver abstraction.
//!
//! The client layer never talks to a database directly. It drives a
//! [`Connection`] obtained from a [`DataSource`], prepares [`Statement`]s on
//! it and drains [`RowStream`]s into cached results. Positional parameters
//! are 1-based, placeholders are `?`.
//!
//! [`memory`] contains a scriptable in-process driver that records every
//! call it receives.

pub mod memory;

use std::sync::Arc;

use parking_lot::Mutex;
use prettysql_common::Value;

use crate::error::ClientResult;

/// A live database connection.
pub trait Connection: Send {
    /// Prepares a statement written with `?` placeholders.
    fn prepare(&mut self, sql: &str) -> ClientResult<Box<dyn Statement>>;

    /// Commits the current transaction.
    fn commit(&mut self) -> ClientResult<()>;

    /// Rolls back the current transaction.
    fn rollback(&mut self) -> ClientResult<()>;

    /// Returns the auto-commit flag.
    fn auto_commit(&self) -> ClientResult<bool>;

    /// Sets the auto-commit flag.
    fn set_auto_commit(&mut self, auto_commit: bool) -> ClientResult<()>;

    /// Returns the read-only flag.
    fn is_read_only(&self) -> ClientResult<bool>;

    /// Sets the read-only flag.
    fn set_read_only(&mut self, read_only: bool) -> ClientResult<()>;

    /// Returns the native isolation level code.
    fn isolation_level(&self) -> ClientResult<i32>;

    /// Sets the native isolation level code.
    fn set_isolation_level(&mut self, level: i32) -> ClientResult<()>;

    /// Closes the connection. Closing twice is a no-op.
    fn close(&mut self) -> ClientResult<()>;

    /// Returns true once the connection is closed.
    fn is_closed(&self) -> ClientResult<bool>;
}

/// A prepared statement.
pub trait Statement: Send {
    /// Binds a value to the 1-based placeholder `index`.
    fn bind(&mut self, index: usize, value: Value) -> ClientResult<()>;

    /// Clears all bound values.
    fn clear_parameters(&mut self) -> ClientResult<()>;

    /// Executes the statement as a query.
    fn execute_query(&mut self) -> ClientResult<Box<dyn RowStream + '_>>;

    /// Executes the statement as an update and returns the affected row count.
    fn execute_update(&mut self) -> ClientResult<u64>;

    /// Adds the current bindings to the batch.
    fn add_batch(&mut self) -> ClientResult<()>;

    /// Executes the batch and returns one count per entry.
    fn execute_batch(&mut self) -> ClientResult<Vec<u64>>;

    /// Closes the statement. Closing twice is a no-op.
    fn close(&mut self) -> ClientResult<()>;

    /// Returns true once the statement is closed.
    fn is_closed(&self) -> bool;
}

/// Forward-only row source.
pub trait RowStream {
    /// Column labels in result order.
    fn columns(&self) -> &[String];

    /// Returns the next row, or `None` once drained.
    fn next_row(&mut self) -> ClientResult<Option<Vec<Value>>>;
}

/// Source of new connections.
pub trait DataSource: Send + Sync {
    /// Opens a new connection.
    fn connect(&self) -> ClientResult<Box<dyn Connection>>;
}

impl<F> DataSource for F
where
    F: Fn() -> ClientResult<Box<dyn Connection>> + Send + Sync,
{
    fn connect(&self) -> ClientResult<Box<dyn Connection>> {
        self()
    }
}

/// Connection shared between a session and its transactions.
pub(crate) type SharedConnection = Arc<Mutex<Box<dyn Connection>>>;

// =============================================================================
// Buffered Rows
// =============================================================================

/// A [`RowStream`] over rows already held in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedRows {
    columns: Vec<String>,
    rows: std::collections::VecDeque<Vec<Value>>,
}

impl BufferedRows {
    /// Creates a stream over the given columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }

    /// Returns the number of rows not yet read.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowStream for BufferedRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> ClientResult<Option<Vec<Value>>> {
        Ok(self.rows.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_rows() {
        let mut rows = BufferedRows::new(
            vec!["id".into()],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        assert_eq!(rows.columns(), ["id".to_string()]);
        assert_eq!(rows.remaining(), 2);
        assert_eq!(rows.next_row().unwrap(), Some(vec![Value::Int(1)]));
        assert_eq!(rows.next_row().unwrap(), Some(vec![Value::Int(2)]));
        assert_eq!(rows.next_row().unwrap(), None);
    }

    #[test]
    fn test_closure_data_source() {
        let source = || -> ClientResult<Box<dyn Connection>> {
            Ok(Box::new(memory::MemoryConnection::new()))
        };
        let conn = source.connect().unwrap();
        assert!(!conn.is_closed().unwrap());
    }
}
