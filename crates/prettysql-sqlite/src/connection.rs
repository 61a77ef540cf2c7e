//! SQLite connection and data source.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use prettysql_client::{ClientError, ClientResult, Connection, DataSource, IsolationLevel, Statement};
use tracing::debug;

use crate::statement::SqliteStatement;

/// How long a connection waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// State shared by a connection and the statements prepared on it.
pub(crate) struct ConnectionState {
    conn: Option<rusqlite::Connection>,
    auto_commit: bool,
    read_only: bool,
    isolation: IsolationLevel,
}

impl ConnectionState {
    pub(crate) fn connection(&self) -> ClientResult<&rusqlite::Connection> {
        self.conn.as_ref().ok_or(ClientError::ConnectionClosed)
    }
}

pub(crate) type SharedState = Arc<Mutex<ConnectionState>>;

/// Maps a rusqlite error to a driver error for `operation`.
pub(crate) fn sql_error(operation: &'static str) -> impl Fn(rusqlite::Error) -> ClientError {
    move |err| ClientError::driver(operation, err)
}

/// A [`Connection`] over one SQLite database handle.
///
/// Auto-commit is emulated with explicit `BEGIN`/`COMMIT`. Read-only maps to
/// `PRAGMA query_only`. SQLite only distinguishes `SERIALIZABLE` (default)
/// and `READ_UNCOMMITTED`; other isolation levels are recorded and reported
/// back but behave as `SERIALIZABLE`.
pub struct SqliteConnection {
    state: SharedState,
}

impl SqliteConnection {
    /// Opens a private in-memory database.
    pub fn open_in_memory() -> ClientResult<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(sql_error("open"))?;
        Self::from_connection(conn)
    }

    /// Opens or creates the database file at `path`.
    pub fn open(path: &Path) -> ClientResult<Self> {
        let conn = rusqlite::Connection::open(path).map_err(sql_error("open"))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: rusqlite::Connection) -> ClientResult<Self> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .map_err(sql_error("open"))?;
        debug!(path = ?conn.path(), "sqlite connection opened");

        Ok(Self {
            state: Arc::new(Mutex::new(ConnectionState {
                conn: Some(conn),
                auto_commit: true,
                read_only: false,
                isolation: IsolationLevel::Serializable,
            })),
        })
    }
}

impl Connection for SqliteConnection {
    fn prepare(&mut self, sql: &str) -> ClientResult<Box<dyn Statement>> {
        let parameter_count = {
            let state = self.state.lock();
            let stmt = state
                .connection()?
                .prepare_cached(sql)
                .map_err(sql_error("prepare"))?;
            stmt.parameter_count()
        };

        Ok(Box::new(SqliteStatement::new(
            sql.to_string(),
            parameter_count,
            Arc::clone(&self.state),
        )))
    }

    fn commit(&mut self) -> ClientResult<()> {
        let state = self.state.lock();
        let conn = state.connection()?;
        if state.auto_commit {
            return Err(ClientError::driver("commit", "connection is in auto-commit mode"));
        }
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT").map_err(sql_error("commit"))?;
        }
        conn.execute_batch("BEGIN").map_err(sql_error("commit"))
    }

    fn rollback(&mut self) -> ClientResult<()> {
        let state = self.state.lock();
        let conn = state.connection()?;
        if state.auto_commit {
            return Err(ClientError::driver("rollback", "connection is in auto-commit mode"));
        }
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK").map_err(sql_error("rollback"))?;
        }
        conn.execute_batch("BEGIN").map_err(sql_error("rollback"))
    }

    fn auto_commit(&self) -> ClientResult<bool> {
        let state = self.state.lock();
        state.connection()?;
        Ok(state.auto_commit)
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> ClientResult<()> {
        let mut state = self.state.lock();
        let conn = state.connection()?;
        if auto_commit == state.auto_commit {
            return Ok(());
        }

        if auto_commit {
            if !conn.is_autocommit() {
                conn.execute_batch("COMMIT").map_err(sql_error("set_auto_commit"))?;
            }
        } else {
            conn.execute_batch("BEGIN").map_err(sql_error("set_auto_commit"))?;
        }
        state.auto_commit = auto_commit;
        Ok(())
    }

    fn is_read_only(&self) -> ClientResult<bool> {
        let state = self.state.lock();
        state.connection()?;
        Ok(state.read_only)
    }

    fn set_read_only(&mut self, read_only: bool) -> ClientResult<()> {
        let mut state = self.state.lock();
        state
            .connection()?
            .pragma_update(None, "query_only", read_only)
            .map_err(sql_error("set_read_only"))?;
        state.read_only = read_only;
        Ok(())
    }

    fn isolation_level(&self) -> ClientResult<i32> {
        let state = self.state.lock();
        state.connection()?;
        Ok(state.isolation.native_code())
    }

    fn set_isolation_level(&mut self, level: i32) -> ClientResult<()> {
        let level = IsolationLevel::from_native(level)?;
        let read_uncommitted = level == IsolationLevel::ReadUncommitted;

        let mut state = self.state.lock();
        state
            .connection()?
            .pragma_update(None, "read_uncommitted", read_uncommitted)
            .map_err(sql_error("set_isolation_level"))?;
        state.isolation = level;
        Ok(())
    }

    fn close(&mut self) -> ClientResult<()> {
        let mut state = self.state.lock();
        let Some(conn) = state.conn.take() else {
            return Ok(());
        };

        match conn.close() {
            Ok(()) => {
                debug!("sqlite connection closed");
                Ok(())
            }
            Err((conn, err)) => {
                state.conn = Some(conn);
                Err(ClientError::driver("close", err))
            }
        }
    }

    fn is_closed(&self) -> ClientResult<bool> {
        Ok(self.state.lock().conn.is_none())
    }
}

// =============================================================================
// Data Source
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Memory,
    File(PathBuf),
}

/// [`DataSource`] opening SQLite connections.
///
/// Every in-memory connection gets its own private database; use a file to
/// share data between sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteDataSource {
    target: Target,
}

impl SqliteDataSource {
    /// Opens private in-memory databases.
    pub fn memory() -> Self {
        Self {
            target: Target::Memory,
        }
    }

    /// Opens the database file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::File(path.into()),
        }
    }

    /// Returns the database file path, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            Target::Memory => None,
            Target::File(path) => Some(path),
        }
    }
}

impl DataSource for SqliteDataSource {
    fn connect(&self) -> ClientResult<Box<dyn Connection>> {
        let connection = match &self.target {
            Target::Memory => SqliteConnection::open_in_memory()?,
            Target::File(path) => SqliteConnection::open(path)?,
        };
        Ok(Box::new(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn execute(conn: &mut SqliteConnection, sql: &str) -> u64 {
        conn.prepare(sql).unwrap().execute_update().unwrap()
    }

    fn count(conn: &mut SqliteConnection) -> i64 {
        let mut stmt = conn.prepare("SELECT count(*) FROM t").unwrap();
        let mut rows = stmt.execute_query().unwrap();
        let row = rows.next_row().unwrap().unwrap();
        row[0].as_i64().unwrap()
    }

    #[test]
    fn test_prepare_rejects_invalid_sql() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        assert!(matches!(
            conn.prepare("SELEC 1"),
            Err(ClientError::Driver { operation: "prepare", .. })
        ));
    }

    #[test]
    fn test_manual_commit_and_rollback() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        execute(&mut conn, "CREATE TABLE t (id INTEGER)");

        conn.set_auto_commit(false).unwrap();
        assert!(!conn.auto_commit().unwrap());
        execute(&mut conn, "INSERT INTO t VALUES (1)");
        conn.rollback().unwrap();
        assert_eq!(count(&mut conn), 0);

        execute(&mut conn, "INSERT INTO t VALUES (2)");
        conn.commit().unwrap();
        conn.set_auto_commit(true).unwrap();
        assert_eq!(count(&mut conn), 1);
    }

    #[test]
    fn test_commit_requires_manual_mode() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        assert!(conn.commit().is_err());
        assert!(conn.rollback().is_err());
    }

    #[test]
    fn test_read_only() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        execute(&mut conn, "CREATE TABLE t (id INTEGER)");
        conn.set_read_only(true).unwrap();
        assert!(conn.is_read_only().unwrap());

        let mut stmt = conn.prepare("INSERT INTO t VALUES (1)").unwrap();
        assert!(stmt.execute_update().is_err());

        conn.set_read_only(false).unwrap();
        execute(&mut conn, "INSERT INTO t VALUES (1)");
    }

    #[test]
    fn test_isolation_levels() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        assert_eq!(conn.isolation_level().unwrap(), 8);
        conn.set_isolation_level(1).unwrap();
        assert_eq!(conn.isolation_level().unwrap(), 1);
        conn.set_isolation_level(2).unwrap();
        assert_eq!(conn.isolation_level().unwrap(), 2);
        assert!(matches!(
            conn.set_isolation_level(3),
            Err(ClientError::UnknownIsolationLevel(_))
        ));
        assert_eq!(conn.isolation_level().unwrap(), 2);
    }

    #[test]
    fn test_close() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT 1").unwrap();
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(conn.is_closed().unwrap());
        assert!(matches!(conn.prepare("SELECT 1"), Err(ClientError::ConnectionClosed)));
        assert!(matches!(stmt.execute_query().err(), Some(ClientError::ConnectionClosed)));
    }

    #[test]
    fn test_file_data_source_shares_data() {
        let dir = TempDir::new().unwrap();
        let source = SqliteDataSource::file(dir.path().join("films.db"));
        assert!(source.path().is_some());

        let mut writer = source.connect().unwrap();
        writer
            .prepare("CREATE TABLE t (id INTEGER)")
            .unwrap()
            .execute_update()
            .unwrap();
        writer
            .prepare("INSERT INTO t VALUES (1)")
            .unwrap()
            .execute_update()
            .unwrap();

        let mut reader = source.connect().unwrap();
        let mut stmt = reader.prepare("SELECT id FROM t").unwrap();
        let mut rows = stmt.execute_query().unwrap();
        assert_eq!(rows.next_row().unwrap(), Some(vec![prettysql_common::Value::Int(1)]));
    }

    #[test]
    fn test_memory_data_source_is_private() {
        let source = SqliteDataSource::memory();
        assert!(source.path().is_none());
        let mut first = source.connect().unwrap();
        first
            .prepare("CREATE TABLE t (id INTEGER)")
            .unwrap()
            .execute_update()
            .unwrap();

        let mut second = source.connect().unwrap();
        assert!(second.prepare("SELECT id FROM t").is_err());
    }
}
