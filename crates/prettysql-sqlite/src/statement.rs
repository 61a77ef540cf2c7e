//! SQLite prepared statements.
//!
//! The compiled statement lives in the connection's statement cache; a
//! [`SqliteStatement`] keeps the SQL text and its bindings and re-fetches the
//! compiled form on every execution. Rows are read while the connection lock
//! is held, so query results are buffered before they are returned.

use prettysql_client::driver::BufferedRows;
use prettysql_client::{ClientError, ClientResult, RowStream, Statement};
use prettysql_common::Value;
use tracing::trace;

use crate::connection::{sql_error, SharedState};
use crate::types::{from_sql, to_sql, DeclaredType};

/// A [`Statement`] prepared on a [`SqliteConnection`](crate::SqliteConnection).
///
/// Parameters that are never bound are sent as NULL.
pub(crate) struct SqliteStatement {
    sql: String,
    bindings: Vec<Value>,
    batch: Vec<Vec<Value>>,
    closed: bool,
    state: SharedState,
}

impl SqliteStatement {
    pub(crate) fn new(sql: String, parameter_count: usize, state: SharedState) -> Self {
        Self {
            sql,
            bindings: vec![Value::Null; parameter_count],
            batch: Vec::new(),
            closed: false,
            state,
        }
    }

    fn ensure_open(&self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::QueryClosed);
        }
        Ok(())
    }

    fn run_update(&self, bindings: &[Value]) -> ClientResult<u64> {
        let state = self.state.lock();
        let mut stmt = state
            .connection()?
            .prepare_cached(&self.sql)
            .map_err(sql_error("prepare"))?;
        bind_all(&mut stmt, bindings)?;
        let changed = stmt.raw_execute().map_err(sql_error("execute_update"))?;
        Ok(changed as u64)
    }
}

fn bind_all(stmt: &mut rusqlite::Statement<'_>, bindings: &[Value]) -> ClientResult<()> {
    for (i, value) in bindings.iter().enumerate() {
        stmt.raw_bind_parameter(i + 1, to_sql(value))
            .map_err(sql_error("bind"))?;
    }
    Ok(())
}

impl Statement for SqliteStatement {
    fn bind(&mut self, index: usize, value: Value) -> ClientResult<()> {
        self.ensure_open()?;
        let count = self.bindings.len();
        match index.checked_sub(1).and_then(|i| self.bindings.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ClientError::ParameterIndexOutOfBounds { index, count }),
        }
    }

    fn clear_parameters(&mut self) -> ClientResult<()> {
        self.ensure_open()?;
        self.bindings.fill(Value::Null);
        Ok(())
    }

    fn execute_query(&mut self) -> ClientResult<Box<dyn RowStream + '_>> {
        self.ensure_open()?;
        trace!(sql = %self.sql, "sqlite query");

        let state = self.state.lock();
        let mut stmt = state
            .connection()?
            .prepare_cached(&self.sql)
            .map_err(sql_error("prepare"))?;
        bind_all(&mut stmt, &self.bindings)?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let declared: Vec<DeclaredType> = stmt
            .columns()
            .iter()
            .map(|column| DeclaredType::parse(column.decl_type()))
            .collect();

        let mut buffered = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next().map_err(sql_error("fetch"))? {
            let mut values = Vec::with_capacity(declared.len());
            for (i, decl) in declared.iter().enumerate() {
                let cell = row.get_ref(i).map_err(sql_error("fetch"))?;
                values.push(from_sql(cell, *decl));
            }
            buffered.push(values);
        }

        Ok(Box::new(BufferedRows::new(columns, buffered)))
    }

    fn execute_update(&mut self) -> ClientResult<u64> {
        self.ensure_open()?;
        trace!(sql = %self.sql, "sqlite update");
        self.run_update(&self.bindings)
    }

    fn add_batch(&mut self) -> ClientResult<()> {
        self.ensure_open()?;
        self.batch.push(self.bindings.clone());
        Ok(())
    }

    fn execute_batch(&mut self) -> ClientResult<Vec<u64>> {
        self.ensure_open()?;
        let batch = std::mem::take(&mut self.batch);
        trace!(sql = %self.sql, entries = batch.len(), "sqlite batch");
        batch.iter().map(|entry| self.run_update(entry)).collect()
    }

    fn close(&mut self) -> ClientResult<()> {
        self.closed = true;
        self.batch.clear();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
