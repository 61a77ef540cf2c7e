//! Transaction handle for explicit transaction control.
//!
//! A [`Transaction`] moves through `NotActive -> Active -> Completed` over a
//! connection shared with its session. Beginning switches the connection to
//! manual commit. Completing (commit or rollback) switches it back to
//! auto-commit and restores the read-only flag and isolation level captured
//! when the transaction was created.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::driver::SharedConnection;
use crate::error::{ClientError, ClientResult};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Transactions not supported.
    None,
    /// Read uncommitted (lowest isolation).
    ReadUncommitted,
    /// Read committed.
    ReadCommitted,
    /// Repeatable read.
    RepeatableRead,
    /// Serializable (highest isolation).
    Serializable,
}

impl IsolationLevel {
    /// All levels in ascending order.
    pub const ALL: [IsolationLevel; 5] = [
        IsolationLevel::None,
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead,
        IsolationLevel::Serializable,
    ];

    /// Returns the driver-native code.
    pub fn native_code(&self) -> i32 {
        match self {
            IsolationLevel::None => 0,
            IsolationLevel::ReadUncommitted => 1,
            IsolationLevel::ReadCommitted => 2,
            IsolationLevel::RepeatableRead => 4,
            IsolationLevel::Serializable => 8,
        }
    }

    /// Maps a driver-native code back to a level.
    pub fn from_native(code: i32) -> ClientResult<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.native_code() == code)
            .ok_or_else(|| ClientError::UnknownIsolationLevel(code.to_string()))
    }

    /// Returns the configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            IsolationLevel::None => "NONE",
            IsolationLevel::ReadUncommitted => "READ_UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ_COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE_READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl TryFrom<i32> for IsolationLevel {
    type Error = ClientError;

    fn try_from(code: i32) -> ClientResult<Self> {
        Self::from_native(code)
    }
}

impl FromStr for IsolationLevel {
    type Err = ClientError;

    /// Accepts configuration names and SQL spellings, ignoring case.
    fn from_str(s: &str) -> ClientResult<Self> {
        let normalized = s.trim().to_uppercase().replace(' ', "_");
        Self::ALL
            .into_iter()
            .find(|level| level.name() == normalized)
            .ok_or_else(|| ClientError::UnknownIsolationLevel(s.to_string()))
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transaction lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Created, not begun.
    NotActive,
    /// Begun, not yet committed or rolled back.
    Active,
    /// Committed or rolled back.
    Completed,
}

/// Unique transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

struct TransactionInner {
    status: TransactionStatus,
    initial_read_only: bool,
    initial_isolation: i32,
}

/// A transaction handle.
///
/// Handles are cheap to clone; all clones observe the same status. Operations
/// that do not apply to the current status are no-ops.
#[derive(Clone)]
pub struct Transaction {
    id: TransactionId,
    connection: SharedConnection,
    inner: Arc<Mutex<TransactionInner>>,
}

impl Transaction {
    /// Creates a transaction over `connection`, capturing its current
    /// read-only flag and isolation level.
    pub(crate) fn new(connection: SharedConnection) -> ClientResult<Self> {
        let (initial_read_only, initial_isolation) = {
            let conn = connection.lock();
            (conn.is_read_only()?, conn.isolation_level()?)
        };

        Ok(Self {
            id: TransactionId::next(),
            connection,
            inner: Arc::new(Mutex::new(TransactionInner {
                status: TransactionStatus::NotActive,
                initial_read_only,
                initial_isolation,
            })),
        })
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current status.
    pub fn status(&self) -> TransactionStatus {
        self.inner.lock().status
    }

    /// Returns true between `begin` and completion.
    pub fn is_active(&self) -> bool {
        self.status() == TransactionStatus::Active
    }

    /// Begins the transaction. No-op unless not yet begun.
    pub fn begin(&self) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        if inner.status != TransactionStatus::NotActive {
            return Ok(());
        }

        self.connection.lock().set_auto_commit(false)?;
        inner.status = TransactionStatus::Active;
        debug!(txn = %self.id, "transaction begun");
        Ok(())
    }

    /// Commits the transaction. No-op unless active.
    pub fn commit(&self) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        if inner.status != TransactionStatus::Active {
            return Ok(());
        }

        self.connection.lock().commit()?;
        self.complete(&mut inner)?;
        debug!(txn = %self.id, "transaction committed");
        Ok(())
    }

    /// Rolls back the transaction. No-op unless active.
    pub fn rollback(&self) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        if inner.status != TransactionStatus::Active {
            return Ok(());
        }

        self.connection.lock().rollback()?;
        self.complete(&mut inner)?;
        debug!(txn = %self.id, "transaction rolled back");
        Ok(())
    }

    fn complete(&self, inner: &mut TransactionInner) -> ClientResult<()> {
        let mut conn = self.connection.lock();
        conn.set_auto_commit(true)?;
        inner.status = TransactionStatus::Completed;
        conn.set_read_only(inner.initial_read_only)?;
        conn.set_isolation_level(inner.initial_isolation)?;
        Ok(())
    }

    /// Rolls back if active, logging instead of returning failures.
    pub(crate) fn stop_quietly(&self) {
        if let Err(err) = self.rollback() {
            warn!(txn = %self.id, error = %err, "failed to roll back transaction");
        }
    }

    /// Returns the connection's read-only flag.
    pub fn is_read_only(&self) -> ClientResult<bool> {
        self.connection.lock().is_read_only()
    }

    /// Sets the connection's read-only flag. Rejected while active.
    pub fn set_read_only(&self, read_only: bool) -> ClientResult<()> {
        self.ensure_not_active("read-only mode")?;
        self.connection.lock().set_read_only(read_only)
    }

    /// Returns the connection's isolation level.
    pub fn isolation_level(&self) -> ClientResult<IsolationLevel> {
        let code = self.connection.lock().isolation_level()?;
        IsolationLevel::from_native(code)
    }

    /// Sets the connection's isolation level. Rejected while active.
    pub fn set_isolation_level(&self, level: IsolationLevel) -> ClientResult<()> {
        self.ensure_not_active("isolation level")?;
        self.connection.lock().set_isolation_level(level.native_code())
    }

    fn ensure_not_active(&self, what: &str) -> ClientResult<()> {
        if self.is_active() {
            return Err(ClientError::InvalidState(format!(
                "cannot change {what} of an active transaction"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}
