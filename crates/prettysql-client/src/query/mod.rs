//! Query handles.
//!
//! A [`Query`] wraps one prepared statement. Parameters are bound by position
//! or, for queries created from named-parameter SQL, by name. Executing a
//! query returns a [`CachedScrollableResult`]; with a [`ResultMapper`]
//! attached, [`Query::unique`] and [`Query::list`] return mapped values.
//!
//! The owning session keeps a second handle to the statement and may close
//! it at any time (eviction, session close). Every operation on a closed
//! query fails with [`ClientError::QueryClosed`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use prettysql_common::Value;
use tracing::{debug, warn};

use crate::driver::Statement;
use crate::error::{ClientError, ClientResult};
use crate::mapper::ResultMapper;
use crate::params::ParameterTable;
use crate::result::CachedScrollableResult;

/// Unique query identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(u64);

impl QueryId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query-{}", self.0)
    }
}

// =============================================================================
// Statement Handle
// =============================================================================

/// Shared ownership of a prepared statement.
#[derive(Clone)]
pub(crate) struct StatementHandle {
    id: QueryId,
    statement: Arc<Mutex<Box<dyn Statement>>>,
}

impl StatementHandle {
    pub(crate) fn new(statement: Box<dyn Statement>) -> Self {
        Self {
            id: QueryId::next(),
            statement: Arc::new(Mutex::new(statement)),
        }
    }

    pub(crate) fn id(&self) -> QueryId {
        self.id
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.statement.lock().is_closed()
    }

    pub(crate) fn close(&self) -> ClientResult<()> {
        self.statement.lock().close()
    }

    /// Closes the statement, logging instead of returning failures.
    pub(crate) fn close_quietly(&self) {
        if let Err(err) = self.close() {
            warn!(query = %self.id, error = %err, "failed to close query");
        }
    }

    fn with_open<R>(&self, f: impl FnOnce(&mut dyn Statement) -> ClientResult<R>) -> ClientResult<R> {
        let mut statement = self.statement.lock();
        if statement.is_closed() {
            return Err(ClientError::QueryClosed);
        }
        f(&mut **statement)
    }
}

// =============================================================================
// Query
// =============================================================================

/// A prepared query.
///
/// `T` is the type produced by the attached result mapper; plain queries use
/// [`Value`] and have no mapper until one is attached.
pub struct Query<T = Value> {
    handle: StatementHandle,
    native_sql: String,
    parameters: Option<ParameterTable>,
    mapper: Option<Box<dyn ResultMapper<T>>>,
    row_capacity_hint: usize,
    log_statements: bool,
}

impl Query<Value> {
    pub(crate) fn new(
        handle: StatementHandle,
        native_sql: String,
        parameters: Option<ParameterTable>,
    ) -> Self {
        Self {
            handle,
            native_sql,
            parameters,
            mapper: None,
            row_capacity_hint: 0,
            log_statements: false,
        }
    }
}

impl<T> Query<T> {
    pub(crate) fn row_capacity_hint(mut self, hint: usize) -> Self {
        self.row_capacity_hint = hint;
        self
    }

    pub(crate) fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Returns the query ID.
    pub fn id(&self) -> QueryId {
        self.handle.id()
    }

    /// Returns the statement as sent to the driver.
    pub fn native_sql(&self) -> &str {
        &self.native_sql
    }

    /// Returns the named parameter table, if the query was created from
    /// named-parameter SQL.
    pub fn parameter_table(&self) -> Option<&ParameterTable> {
        self.parameters.as_ref()
    }

    /// Returns true until the query is closed or evicted.
    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// Closes the query. Closing twice is a no-op.
    pub fn close(&self) -> ClientResult<()> {
        self.handle.close()
    }

    /// Runs `f` against the underlying driver statement.
    ///
    /// Fails with [`ClientError::QueryClosed`] once the query is closed.
    pub fn with_statement<R>(
        &self,
        f: impl FnOnce(&mut dyn Statement) -> ClientResult<R>,
    ) -> ClientResult<R> {
        self.handle.with_open(f)
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Binds `value` to the 1-based positional parameter `index`.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> ClientResult<&mut Self> {
        let value = value.into();
        self.handle.with_open(|statement| statement.bind(index, value))?;
        Ok(self)
    }

    /// Binds `value` to every occurrence of the named parameter `name`.
    pub fn set_named(&mut self, name: &str, value: impl Into<Value>) -> ClientResult<&mut Self> {
        let table = self.parameters.as_ref().ok_or(ClientError::NoNamedParameters)?;
        let indices = table
            .indices_of(name)
            .ok_or_else(|| ClientError::UnknownParameter(name.to_string()))?
            .to_vec();

        let value = value.into();
        self.handle.with_open(|statement| {
            for index in indices {
                statement.bind(index, value.clone())?;
            }
            Ok(())
        })?;
        Ok(self)
    }

    /// Clears all bound parameters.
    pub fn clear_parameters(&mut self) -> ClientResult<&mut Self> {
        self.handle.with_open(|statement| statement.clear_parameters())?;
        Ok(self)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn trace(&self, operation: &str) {
        if self.log_statements {
            debug!(query = %self.handle.id(), sql = %self.native_sql, "{}", operation);
        }
    }

    /// Executes the query and caches the full result.
    pub fn execute(&self) -> ClientResult<CachedScrollableResult> {
        self.trace("execute query");
        let hint = self.row_capacity_hint;
        self.handle.with_open(|statement| {
            let mut rows = statement.execute_query()?;
            CachedScrollableResult::from_stream(&mut *rows, hint)
        })
    }

    /// Executes the query as an update and returns the affected row count.
    pub fn execute_update(&self) -> ClientResult<u64> {
        self.trace("execute update");
        self.handle.with_open(|statement| statement.execute_update())
    }

    /// Adds the current bindings to the batch.
    pub fn add_batch(&mut self) -> ClientResult<&mut Self> {
        self.handle.with_open(|statement| statement.add_batch())?;
        Ok(self)
    }

    /// Executes the batch and returns one update count per entry.
    pub fn execute_batch(&self) -> ClientResult<Vec<u64>> {
        self.trace("execute batch");
        self.handle.with_open(|statement| statement.execute_batch())
    }

    // =========================================================================
    // Mapping
    // =========================================================================

    /// Attaches a result mapper, changing the query's result type.
    pub fn with_mapper<U, M>(self, mapper: M) -> Query<U>
    where
        M: ResultMapper<U> + 'static,
    {
        Query {
            handle: self.handle,
            native_sql: self.native_sql,
            parameters: self.parameters,
            mapper: Some(Box::new(mapper)),
            row_capacity_hint: self.row_capacity_hint,
            log_statements: self.log_statements,
        }
    }

    /// Returns true if a result mapper is attached.
    pub fn has_mapper(&self) -> bool {
        self.mapper.is_some()
    }

    fn mapper(&self) -> ClientResult<&dyn ResultMapper<T>> {
        self.mapper
            .as_deref()
            .ok_or(ClientError::MissingResultMapper(std::any::type_name::<T>()))
    }

    /// Executes the query and maps the first row, if any.
    pub fn unique(&self) -> ClientResult<Option<T>> {
        let mapper = self.mapper()?;
        let mut result = self.execute()?;
        if result.next() {
            mapper.map(&result).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Executes the query and maps every row in order.
    pub fn list(&self) -> ClientResult<Vec<T>> {
        let mapper = self.mapper()?;
        let mut result = self.execute()?;
        let mut items = Vec::with_capacity(result.row_count());
        while result.next() {
            items.push(mapper.map(&result)?);
        }
        Ok(items)
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("id", &self.handle.id())
            .field("native_sql", &self.native_sql)
            .field("parameters", &self.parameters)
            .field("has_mapper", &self.mapper.is_some())
            .finish()
    }
}
