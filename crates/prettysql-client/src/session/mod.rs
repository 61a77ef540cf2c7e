//! Sessions.
//!
//! A [`Session`] owns one driver connection, the current [`Transaction`] and
//! a bounded registry of the queries created through it. When the registry is
//! full, creating a query closes the oldest one. Closing the session closes
//! every registered query, rolls back an unfinished transaction and closes
//! the connection.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use prettysql_common::ClientConfig;
use tracing::{debug, warn};

use crate::driver::{Connection, SharedConnection};
use crate::error::{ClientError, ClientResult};
use crate::mapper::ResultMapper;
use crate::params::NamedQueryPlan;
use crate::query::{Query, StatementHandle};
use crate::registry::{BoundedQueue, RegistryStats};
use crate::transaction::Transaction;

/// Unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A unit of work over one connection.
pub struct Session {
    id: SessionId,
    connection: SharedConnection,
    config: ClientConfig,
    transaction: Option<Transaction>,
    queries: BoundedQueue<StatementHandle>,
    closed: bool,
}

impl Session {
    /// Creates a session over `connection` with the default configuration.
    pub fn new(connection: Box<dyn Connection>) -> Self {
        Self::with_config(connection, ClientConfig::default())
    }

    /// Creates a session over `connection`.
    pub fn with_config(connection: Box<dyn Connection>, config: ClientConfig) -> Self {
        let session = Self {
            id: SessionId::next(),
            connection: Arc::new(Mutex::new(connection)),
            queries: BoundedQueue::new(config.effective_max_live_queries()),
            config,
            transaction: None,
            closed: false,
        };
        debug!(session = %session.id, "session opened");
        session
    }

    /// Returns the session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn ensure_open(&self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    fn prepare(&mut self, native_sql: &str) -> ClientResult<StatementHandle> {
        self.ensure_open()?;

        let statement = self.connection.lock().prepare(native_sql)?;
        let handle = StatementHandle::new(statement);

        let session = self.id;
        self.queries.offer(handle.clone(), |evicted| {
            debug!(session = %session, query = %evicted.id(), "evicting oldest query");
            evicted.close_quietly();
        });

        if self.config.log_statements {
            debug!(session = %self.id, query = %handle.id(), sql = %native_sql, "statement prepared");
        }
        Ok(handle)
    }

    fn configure<T>(&self, query: Query<T>) -> Query<T> {
        query
            .row_capacity_hint(self.config.effective_row_capacity_hint())
            .log_statements(self.config.log_statements)
    }

    /// Creates a query from SQL with native `?` placeholders.
    pub fn create_query(&mut self, sql: &str) -> ClientResult<Query> {
        let handle = self.prepare(sql)?;
        Ok(self.configure(Query::new(handle, sql.to_string(), None)))
    }

    /// Creates a query from SQL with native `?` placeholders whose rows are
    /// read through `mapper`.
    pub fn create_typed_query<T, M>(&mut self, sql: &str, mapper: M) -> ClientResult<Query<T>>
    where
        M: ResultMapper<T> + 'static,
    {
        Ok(self.create_query(sql)?.with_mapper(mapper))
    }

    /// Creates a query from SQL with `:name` or `:{name}` parameters.
    pub fn create_named_query(&mut self, sql: &str) -> ClientResult<Query> {
        self.ensure_open()?;
        let plan = NamedQueryPlan::process(sql)?;
        let table = plan.parameter_table();
        let (native_sql, _) = plan.into_parts();

        let handle = self.prepare(&native_sql)?;
        Ok(self.configure(Query::new(handle, native_sql, Some(table))))
    }

    /// Creates a named-parameter query whose rows are read through `mapper`.
    pub fn create_typed_named_query<T, M>(&mut self, sql: &str, mapper: M) -> ClientResult<Query<T>>
    where
        M: ResultMapper<T> + 'static,
    {
        Ok(self.create_named_query(sql)?.with_mapper(mapper))
    }

    /// Returns the number of registered queries that are still open.
    pub fn live_queries(&self) -> usize {
        self.queries.iter().filter(|handle| handle.is_active()).count()
    }

    /// Returns query registry statistics.
    pub fn registry_stats(&self) -> &RegistryStats {
        self.queries.stats()
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Returns the current transaction, if one was created.
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Returns the active transaction, or creates and begins a new one.
    pub fn begin_transaction(&mut self) -> ClientResult<Transaction> {
        self.ensure_open()?;
        if let Some(txn) = self.transaction.as_ref().filter(|t| t.is_active()) {
            return Ok(txn.clone());
        }

        let txn = Transaction::new(Arc::clone(&self.connection))?;
        txn.begin()?;
        self.transaction = Some(txn.clone());
        Ok(txn)
    }

    /// Creates a new transaction without beginning it. An active transaction
    /// is rolled back first.
    pub fn new_transaction(&mut self) -> ClientResult<Transaction> {
        self.ensure_open()?;
        if let Some(previous) = self.transaction.take() {
            previous.stop_quietly();
        }

        let txn = Transaction::new(Arc::clone(&self.connection))?;
        self.transaction = Some(txn.clone());
        Ok(txn)
    }

    /// Runs `work` inside a transaction.
    ///
    /// Commits when `work` succeeds. When it fails, rolls back and returns
    /// the error from `work`; a rollback failure is only logged.
    pub fn do_in_transaction<R, E, F>(&mut self, work: F) -> Result<R, E>
    where
        F: FnOnce(&mut Session) -> Result<R, E>,
        E: From<ClientError>,
    {
        let txn = self.begin_transaction()?;
        match work(self) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback() {
                    warn!(session = %self.id, txn = %txn.id(), error = %rollback_err, "rollback after failed work failed");
                }
                Err(err)
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Runs `f` against the underlying driver connection.
    ///
    /// Changes made here bypass the session's transaction bookkeeping.
    pub fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut dyn Connection) -> ClientResult<R>,
    ) -> ClientResult<R> {
        self.ensure_open()?;
        let mut connection = self.connection.lock();
        f(&mut **connection)
    }

    /// Returns true until the session or its connection is closed.
    pub fn is_open(&self) -> bool {
        !self.closed && matches!(self.connection.lock().is_closed(), Ok(false))
    }

    /// Closes every registered query, rolls back an unfinished transaction
    /// and closes the connection. Closing twice is a no-op.
    pub fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.queries.release(|handle| handle.close_quietly());
        if let Some(txn) = self.transaction.take() {
            txn.stop_quietly();
        }

        let result = self.connection.lock().close();
        debug!(session = %self.id, "session closed");
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(session = %self.id, error = %err, "failed to close session");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .field("registered_queries", &self.queries.len())
            .field("transaction", &self.transaction)
            .finish()
    }
}
