use std::path::{Path, PathBuf};

use prettysql_client::{CachedScrollableResult, ClientError, ClientResult, SessionFactory};
use prettysql_common::ClientConfig;
use prettysql_sqlite::SqliteDataSource;
use tempfile::TempDir;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Schema of the films table.
pub const CREATE_FILMS: &str = "CREATE TABLE films (\
    id INTEGER NOT NULL, \
    original_name CHARACTER VARYING(120), \
    year SMALLINT)";

/// One row of the films table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Film {
    /// Film ID.
    pub id: i32,
    /// Original title.
    pub original_name: String,
    /// Release year.
    pub year: i16,
}

impl Film {
    /// Creates a film.
    pub fn new(id: i32, original_name: &str, year: i16) -> Self {
        Self {
            id,
            original_name: original_name.to_string(),
            year,
        }
    }

    /// Reads the film at the result's current row.
    pub fn from_row(row: &CachedScrollableResult) -> ClientResult<Self> {
        let missing = |column: &str| ClientError::InvalidValue(format!("{column} is NULL"));
        Ok(Self {
            id: row.get_by_name("id")?.ok_or_else(|| missing("id"))?,
            original_name: row.get_by_name("original_name")?.unwrap_or_default(),
            year: row.get_by_name("year")?.ok_or_else(|| missing("year"))?,
        })
    }
}

/// Rows loaded into every fresh fixture.
pub const FILMS: [(i32, &str, i16); 3] = [
    (1, "The Lord of the Rings: The Fellowship of the Ring", 2001),
    (2, "The Lord of the Rings: The Two Towers", 2002),
    (3, "The Lord of the Rings: The Return of the King", 2003),
];

/// Installs a test-writer tracing subscriber once per process.
///
/// Filtering follows `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A temporary SQLite database holding the films table.
///
/// The database file lives as long as the fixture.
pub struct FilmsDb {
    _dir: TempDir,
    path: PathBuf,
    factory: SessionFactory,
}

impl FilmsDb {
    /// Creates the fixture with the default client configuration.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates the fixture with `config` applied to every session.
    pub fn with_config(config: ClientConfig) -> anyhow::Result<Self> {
        init_tracing();

        let dir = TempDir::new()?;
        let path = dir.path().join("films.db");
        let factory = SessionFactory::new(SqliteDataSource::file(&path)).with_config(config);

        let mut session = factory.open_session()?;
        session.create_query(CREATE_FILMS)?.execute_update()?;

        let mut insert = session
            .create_named_query("INSERT INTO films VALUES (:id, :original_name, :year)")?;
        for (id, original_name, year) in FILMS {
            insert
                .set_named("id", id)?
                .set_named("original_name", original_name)?
                .set_named("year", year)?
                .add_batch()?;
        }
        insert.execute_batch()?;
        session.close()?;

        debug!(path = %path.display(), "films fixture created");
        Ok(Self {
            _dir: dir,
            path,
            factory,
        })
    }

    /// Returns the session factory over the fixture database.
    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Counts the films visible to a fresh session.
    pub fn count(&self) -> anyhow::Result<i64> {
        let mut session = self.factory.open_session()?;
        let count = session
            .create_typed_query("SELECT count(*) FROM films", prettysql_client::first_column::<i64>())?
            .unique()?
            .flatten()
            .unwrap_or_default();
        session.close()?;
        Ok(count)
    }

    /// Loads the film with `id` through a fresh session.
    pub fn film(&self, id: i32) -> anyhow::Result<Option<Film>> {
        let mut session = self.factory.open_session()?;
        let mut query = session.create_typed_named_query(
            "SELECT id, original_name, year FROM films WHERE id = :id",
            Film::from_row,
        )?;
        query.set_named("id", id)?;
        let film = query.unique()?;
        session.close()?;
        Ok(film)
    }
}
