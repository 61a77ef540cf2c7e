//! In-memory driver.
//!
//! [`MemoryConnection`] keeps connection flags in shared state, serves canned
//! result sets keyed by native SQL and records every call in order. A
//! [`MemoryProbe`] cloned from the connection reads that state back after the
//! connection has been handed to a session, and can inject failures.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use prettysql_common::{Value, NATIVE_PARAMETER};

use super::{Connection, DataSource, RowStream, Statement};
use crate::error::{ClientError, ClientResult};

/// A call received by the in-memory driver.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    /// Statement prepared.
    Prepare(String),
    /// Value bound to a statement.
    Bind {
        /// Statement SQL.
        sql: String,
        /// 1-based placeholder index.
        index: usize,
        /// Bound value.
        value: Value,
    },
    /// Statement bindings cleared.
    ClearParameters(String),
    /// Statement executed as a query.
    ExecuteQuery(String),
    /// Statement executed as an update.
    ExecuteUpdate(String),
    /// Bindings added to the batch.
    AddBatch(String),
    /// Batch executed.
    ExecuteBatch(String),
    /// Statement closed.
    CloseStatement(String),
    /// Transaction committed.
    Commit,
    /// Transaction rolled back.
    Rollback,
    /// Auto-commit changed.
    SetAutoCommit(bool),
    /// Read-only changed.
    SetReadOnly(bool),
    /// Isolation level changed.
    SetIsolationLevel(i32),
    /// Connection closed.
    Close,
}

/// Operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// `Connection::prepare`.
    Prepare,
    /// `Statement::execute_query`.
    ExecuteQuery,
    /// `Statement::execute_update`.
    ExecuteUpdate,
    /// `Connection::commit`.
    Commit,
    /// `Connection::rollback`.
    Rollback,
    /// `Connection::close`.
    Close,
    /// `Statement::close`.
    CloseStatement,
}

impl FailPoint {
    fn operation(self) -> &'static str {
        match self {
            FailPoint::Prepare => "prepare",
            FailPoint::ExecuteQuery => "execute_query",
            FailPoint::ExecuteUpdate => "execute_update",
            FailPoint::Commit => "commit",
            FailPoint::Rollback => "rollback",
            FailPoint::Close => "close",
            FailPoint::CloseStatement => "close_statement",
        }
    }
}

/// A canned result set.
#[derive(Debug, Clone, Default)]
pub struct ResultFixture {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    fail_after: Option<usize>,
}

impl ResultFixture {
    /// Creates a fixture with the given column labels.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            fail_after: None,
        }
    }

    /// Appends a row.
    pub fn row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Makes the stream fail after yielding `rows` rows.
    pub fn fail_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }
}

#[derive(Debug, Default)]
struct Fixtures {
    results: HashMap<String, ResultFixture>,
    update_counts: HashMap<String, u64>,
}

#[derive(Debug)]
struct MemoryState {
    auto_commit: bool,
    read_only: bool,
    isolation: i32,
    closed: bool,
    calls: Vec<DriverCall>,
    fixtures: Fixtures,
    failures: HashSet<FailPoint>,
    open_statements: usize,
}

impl MemoryState {
    fn new(fixtures: Fixtures) -> Self {
        Self {
            auto_commit: true,
            read_only: false,
            isolation: 2,
            closed: false,
            calls: Vec::new(),
            fixtures,
            failures: HashSet::new(),
            open_statements: 0,
        }
    }

    fn check(&self, point: FailPoint) -> ClientResult<()> {
        if self.failures.contains(&point) {
            return Err(ClientError::driver(point.operation(), "injected failure"));
        }
        Ok(())
    }

    fn ensure_open(&self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(())
    }
}

// =============================================================================
// Probe
// =============================================================================

/// Read-back and scripting handle for a [`MemoryConnection`].
#[derive(Debug, Clone)]
pub struct MemoryProbe {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryProbe {
    /// Returns all recorded calls.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Counts recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&DriverCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Returns the auto-commit flag.
    pub fn auto_commit(&self) -> bool {
        self.state.lock().auto_commit
    }

    /// Returns the read-only flag.
    pub fn read_only(&self) -> bool {
        self.state.lock().read_only
    }

    /// Returns the isolation level code.
    pub fn isolation(&self) -> i32 {
        self.state.lock().isolation
    }

    /// Returns true once the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of prepared statements not yet closed.
    pub fn open_statements(&self) -> usize {
        self.state.lock().open_statements
    }

    /// Serves `fixture` for statements prepared from `sql`.
    pub fn set_result(&self, sql: impl Into<String>, fixture: ResultFixture) {
        self.state.lock().fixtures.results.insert(sql.into(), fixture);
    }

    /// Returns `count` from updates of statements prepared from `sql`.
    pub fn set_update_count(&self, sql: impl Into<String>, count: u64) {
        self.state.lock().fixtures.update_counts.insert(sql.into(), count);
    }

    /// Makes `point` fail until cleared.
    pub fn fail_on(&self, point: FailPoint) {
        self.state.lock().failures.insert(point);
    }

    /// Clears an injected failure.
    pub fn clear_failure(&self, point: FailPoint) {
        self.state.lock().failures.remove(&point);
    }
}

// =============================================================================
// Connection
// =============================================================================

/// In-memory [`Connection`].
#[derive(Debug)]
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnection {
    /// Creates an open connection in auto-commit mode, read-write, at
    /// `READ_COMMITTED`.
    pub fn new() -> Self {
        Self::with_fixtures(Fixtures::default())
    }

    fn with_fixtures(fixtures: Fixtures) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::new(fixtures))),
        }
    }

    /// Sets the initial read-only flag.
    pub fn with_read_only(self, read_only: bool) -> Self {
        self.state.lock().read_only = read_only;
        self
    }

    /// Sets the initial isolation level code.
    pub fn with_isolation(self, level: i32) -> Self {
        self.state.lock().isolation = level;
        self
    }

    /// Returns a probe sharing this connection's state.
    pub fn probe(&self) -> MemoryProbe {
        MemoryProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl Connection for MemoryConnection {
    fn prepare(&mut self, sql: &str) -> ClientResult<Box<dyn Statement>> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.check(FailPoint::Prepare)?;
        state.calls.push(DriverCall::Prepare(sql.to_string()));
        state.open_statements += 1;

        Ok(Box::new(MemoryStatement {
            sql: sql.to_string(),
            parameter_count: sql.matches(NATIVE_PARAMETER).count(),
            bindings: HashMap::new(),
            batch: Vec::new(),
            closed: false,
            state: Arc::clone(&self.state),
        }))
    }

    fn commit(&mut self) -> ClientResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.check(FailPoint::Commit)?;
        state.calls.push(DriverCall::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> ClientResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.check(FailPoint::Rollback)?;
        state.calls.push(DriverCall::Rollback);
        Ok(())
    }

    fn auto_commit(&self) -> ClientResult<bool> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.auto_commit)
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> ClientResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.calls.push(DriverCall::SetAutoCommit(auto_commit));
        state.auto_commit = auto_commit;
        Ok(())
    }

    fn is_read_only(&self) -> ClientResult<bool> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.read_only)
    }

    fn set_read_only(&mut self, read_only: bool) -> ClientResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.calls.push(DriverCall::SetReadOnly(read_only));
        state.read_only = read_only;
        Ok(())
    }

    fn isolation_level(&self) -> ClientResult<i32> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.isolation)
    }

    fn set_isolation_level(&mut self, level: i32) -> ClientResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.calls.push(DriverCall::SetIsolationLevel(level));
        state.isolation = level;
        Ok(())
    }

    fn close(&mut self) -> ClientResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        state.check(FailPoint::Close)?;
        state.calls.push(DriverCall::Close);
        state.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> ClientResult<bool> {
        Ok(self.state.lock().closed)
    }
}

// =============================================================================
// Statement
// =============================================================================

struct MemoryStatement {
    sql: String,
    parameter_count: usize,
    bindings: HashMap<usize, Value>,
    batch: Vec<HashMap<usize, Value>>,
    closed: bool,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStatement {
    fn ensure_open(&self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::QueryClosed);
        }
        self.state.lock().ensure_open()
    }
}

impl Statement for MemoryStatement {
    fn bind(&mut self, index: usize, value: Value) -> ClientResult<()> {
        self.ensure_open()?;
        if index == 0 || index > self.parameter_count {
            return Err(ClientError::ParameterIndexOutOfBounds {
                index,
                count: self.parameter_count,
            });
        }
        self.state.lock().calls.push(DriverCall::Bind {
            sql: self.sql.clone(),
            index,
            value: value.clone(),
        });
        self.bindings.insert(index, value);
        Ok(())
    }

    fn clear_parameters(&mut self) -> ClientResult<()> {
        self.ensure_open()?;
        self.state
            .lock()
            .calls
            .push(DriverCall::ClearParameters(self.sql.clone()));
        self.bindings.clear();
        Ok(())
    }

    fn execute_query(&mut self) -> ClientResult<Box<dyn RowStream + '_>> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.check(FailPoint::ExecuteQuery)?;
        state.calls.push(DriverCall::ExecuteQuery(self.sql.clone()));
        let fixture = state
            .fixtures
            .results
            .get(&self.sql)
            .cloned()
            .unwrap_or_default();

        Ok(Box::new(FixtureRows {
            fixture,
            position: 0,
        }))
    }

    fn execute_update(&mut self) -> ClientResult<u64> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.check(FailPoint::ExecuteUpdate)?;
        state.calls.push(DriverCall::ExecuteUpdate(self.sql.clone()));
        Ok(state
            .fixtures
            .update_counts
            .get(&self.sql)
            .copied()
            .unwrap_or(0))
    }

    fn add_batch(&mut self) -> ClientResult<()> {
        self.ensure_open()?;
        self.state
            .lock()
            .calls
            .push(DriverCall::AddBatch(self.sql.clone()));
        self.batch.push(self.bindings.clone());
        Ok(())
    }

    fn execute_batch(&mut self) -> ClientResult<Vec<u64>> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.calls.push(DriverCall::ExecuteBatch(self.sql.clone()));
        let count = state
            .fixtures
            .update_counts
            .get(&self.sql)
            .copied()
            .unwrap_or(0);
        let counts = vec![count; self.batch.len()];
        self.batch.clear();
        Ok(counts)
    }

    fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Ok(());
        }
        let mut state = self.state.lock();
        state.check(FailPoint::CloseStatement)?;
        state.calls.push(DriverCall::CloseStatement(self.sql.clone()));
        state.open_statements = state.open_statements.saturating_sub(1);
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

struct FixtureRows {
    fixture: ResultFixture,
    position: usize,
}

impl RowStream for FixtureRows {
    fn columns(&self) -> &[String] {
        &self.fixture.columns
    }

    fn next_row(&mut self) -> ClientResult<Option<Vec<Value>>> {
        if self.fixture.fail_after == Some(self.position) {
            return Err(ClientError::driver("fetch", "injected failure"));
        }
        let row = self.fixture.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }
}

// =============================================================================
// Data Source
// =============================================================================

/// [`DataSource`] handing out fresh [`MemoryConnection`]s.
///
/// Fixtures registered on the data source are copied into every connection it
/// opens; probes for opened connections are kept in open order.
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    results: Mutex<HashMap<String, ResultFixture>>,
    update_counts: Mutex<HashMap<String, u64>>,
    probes: Mutex<Vec<MemoryProbe>>,
}

impl MemoryDataSource {
    /// Creates a data source without fixtures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `fixture` on every connection for `sql`.
    pub fn with_result(self, sql: impl Into<String>, fixture: ResultFixture) -> Self {
        self.results.lock().insert(sql.into(), fixture);
        self
    }

    /// Returns `count` from updates on every connection for `sql`.
    pub fn with_update_count(self, sql: impl Into<String>, count: u64) -> Self {
        self.update_counts.lock().insert(sql.into(), count);
        self
    }

    /// Returns the number of connections opened so far.
    pub fn connections_opened(&self) -> usize {
        self.probes.lock().len()
    }

    /// Returns probes for all opened connections.
    pub fn probes(&self) -> Vec<MemoryProbe> {
        self.probes.lock().clone()
    }
}

impl DataSource for MemoryDataSource {
    fn connect(&self) -> ClientResult<Box<dyn Connection>> {
        let connection = MemoryConnection::with_fixtures(Fixtures {
            results: self.results.lock().clone(),
            update_counts: self.update_counts.lock().clone(),
        });
        self.probes.lock().push(connection.probe());
        Ok(Box::new(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_flags() {
        let mut conn = MemoryConnection::new().with_isolation(8).with_read_only(true);
        let probe = conn.probe();

        assert!(conn.auto_commit().unwrap());
        assert!(conn.is_read_only().unwrap());
        assert_eq!(conn.isolation_level().unwrap(), 8);

        conn.set_auto_commit(false).unwrap();
        conn.set_isolation_level(1).unwrap();
        assert!(!probe.auto_commit());
        assert_eq!(probe.isolation(), 1);
        assert_eq!(
            probe.calls(),
            vec![DriverCall::SetAutoCommit(false), DriverCall::SetIsolationLevel(1)]
        );
    }

    #[test]
    fn test_closed_connection() {
        let mut conn = MemoryConnection::new();
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(conn.is_closed().unwrap());
        assert!(matches!(conn.prepare("SELECT 1"), Err(ClientError::ConnectionClosed)));
        assert_eq!(conn.probe().count(|c| *c == DriverCall::Close), 1);
    }

    #[test]
    fn test_statement_fixture() {
        let mut conn = MemoryConnection::new();
        let probe = conn.probe();
        probe.set_result(
            "SELECT id FROM t WHERE id > ?",
            ResultFixture::new(["id"]).row(vec![Value::Int(2)]),
        );

        let mut stmt = conn.prepare("SELECT id FROM t WHERE id > ?").unwrap();
        stmt.bind(1, Value::Int(1)).unwrap();
        assert!(matches!(
            stmt.bind(2, Value::Int(1)),
            Err(ClientError::ParameterIndexOutOfBounds { index: 2, count: 1 })
        ));

        let mut rows = stmt.execute_query().unwrap();
        assert_eq!(rows.columns(), ["id".to_string()]);
        assert_eq!(rows.next_row().unwrap(), Some(vec![Value::Int(2)]));
        assert_eq!(rows.next_row().unwrap(), None);
        drop(rows);

        assert_eq!(probe.open_statements(), 1);
        stmt.close().unwrap();
        assert!(stmt.is_closed());
        assert_eq!(probe.open_statements(), 0);
        assert!(matches!(stmt.execute_update(), Err(ClientError::QueryClosed)));
    }

    #[test]
    fn test_batch_counts() {
        let mut conn = MemoryConnection::new();
        conn.probe().set_update_count("INSERT INTO t VALUES (?)", 1);

        let mut stmt = conn.prepare("INSERT INTO t VALUES (?)").unwrap();
        for i in 0..3 {
            stmt.bind(1, Value::Int(i)).unwrap();
            stmt.add_batch().unwrap();
        }
        assert_eq!(stmt.execute_batch().unwrap(), vec![1, 1, 1]);
        assert!(stmt.execute_batch().unwrap().is_empty());
    }

    #[test]
    fn test_injected_failures() {
        let mut conn = MemoryConnection::new();
        let probe = conn.probe();
        probe.fail_on(FailPoint::Commit);
        assert!(matches!(
            conn.commit(),
            Err(ClientError::Driver { operation: "commit", .. })
        ));
        probe.clear_failure(FailPoint::Commit);
        conn.commit().unwrap();
    }

    #[test]
    fn test_data_source_copies_fixtures() {
        let source = MemoryDataSource::new()
            .with_result("SELECT 1", ResultFixture::new(["one"]).row(vec![Value::Int(1)]));

        let mut first = source.connect().unwrap();
        let _second = source.connect().unwrap();
        assert_eq!(source.connections_opened(), 2);

        let mut stmt = first.prepare("SELECT 1").unwrap();
        let mut rows = stmt.execute_query().unwrap();
        assert_eq!(rows.next_row().unwrap(), Some(vec![Value::Int(1)]));
        assert_eq!(source.probes()[0].calls()[0], DriverCall::Prepare("SELECT 1".into()));
        assert!(source.probes()[1].calls().is_empty());
    }
}
