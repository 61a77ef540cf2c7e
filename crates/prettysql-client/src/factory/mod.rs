//! Session factory.
//!
//! A [`SessionFactory`] opens sessions over connections from a
//! [`DataSource`], applying the configured connection defaults. It is cheap
//! to clone and can be shared across threads; each thread keeps its current
//! session in its own [`SessionContext`].

mod context;

pub use context::SessionContext;

use std::sync::Arc;

use prettysql_common::ClientConfig;
use tracing::{debug, warn};

use crate::driver::{Connection, DataSource};
use crate::error::ClientResult;
use crate::session::Session;
use crate::transaction::IsolationLevel;

/// Opens sessions from a data source.
#[derive(Clone)]
pub struct SessionFactory {
    data_source: Arc<dyn DataSource>,
    config: ClientConfig,
}

impl SessionFactory {
    /// Creates a factory with the default configuration.
    pub fn new(data_source: impl DataSource + 'static) -> Self {
        Self::from_arc(Arc::new(data_source))
    }

    /// Creates a factory over a shared data source.
    pub fn from_arc(data_source: Arc<dyn DataSource>) -> Self {
        Self {
            data_source,
            config: ClientConfig::default(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the data source.
    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    /// Opens a new session on a new connection.
    pub fn open_session(&self) -> ClientResult<Session> {
        let mut connection = self.data_source.connect()?;
        if let Err(err) = self.apply_defaults(&mut *connection) {
            if let Err(close_err) = connection.close() {
                warn!(error = %close_err, "failed to close connection after setup error");
            }
            return Err(err);
        }

        let session = Session::with_config(connection, self.config.clone());
        debug!(session = %session.id(), "session created by factory");
        Ok(session)
    }

    /// Returns a new context for the calling thread.
    pub fn context(&self) -> SessionContext {
        SessionContext::new(self.clone())
    }

    fn apply_defaults(&self, connection: &mut dyn Connection) -> ClientResult<()> {
        if let Some(read_only) = self.config.default_read_only {
            connection.set_read_only(read_only)?;
        }
        if let Some(name) = &self.config.default_isolation {
            let level: IsolationLevel = name.parse()?;
            connection.set_isolation_level(level.native_code())?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
