//! Client configuration.
//!
//! [`ClientConfig`] controls how sessions opened by a session factory behave.
//! It can be built in code or loaded from a TOML file:
//!
//! ```toml
//! max_live_queries = 32
//! row_capacity_hint = 128
//! default_read_only = false
//! default_isolation = "READ_COMMITTED"
//! log_statements = true
//! ```

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_LIVE_QUERIES, DEFAULT_ROW_CAPACITY_HINT, MAX_MAX_LIVE_QUERIES,
    MAX_ROW_CAPACITY_HINT, MIN_MAX_LIVE_QUERIES,
};

/// Session-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Maximum number of live query handles tracked per session.
    #[serde(default = "default_max_live_queries")]
    pub max_live_queries: usize,

    /// Initial per-column capacity of cached results.
    #[serde(default = "default_row_capacity_hint")]
    pub row_capacity_hint: usize,

    /// Read-only mode applied to each new connection, if set.
    #[serde(default)]
    pub default_read_only: Option<bool>,

    /// Isolation level name applied to each new connection, if set
    /// (`NONE`, `READ_UNCOMMITTED`, `READ_COMMITTED`, `REPEATABLE_READ`,
    /// `SERIALIZABLE`).
    #[serde(default)]
    pub default_isolation: Option<String>,

    /// Log every prepared statement at debug level.
    #[serde(default)]
    pub log_statements: bool,
}

fn default_max_live_queries() -> usize {
    DEFAULT_MAX_LIVE_QUERIES
}

fn default_row_capacity_hint() -> usize {
    DEFAULT_ROW_CAPACITY_HINT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_live_queries: default_max_live_queries(),
            row_capacity_hint: default_row_capacity_hint(),
            default_read_only: None,
            default_isolation: None,
            log_statements: false,
        }
    }
}

impl ClientConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the live query bound, clamped to the accepted range.
    pub fn max_live_queries(mut self, max: usize) -> Self {
        self.max_live_queries = max.clamp(MIN_MAX_LIVE_QUERIES, MAX_MAX_LIVE_QUERIES);
        self
    }

    /// Sets the cached result capacity hint, capped at
    /// [`MAX_ROW_CAPACITY_HINT`].
    pub fn row_capacity_hint(mut self, hint: usize) -> Self {
        self.row_capacity_hint = hint.min(MAX_ROW_CAPACITY_HINT);
        self
    }

    /// Sets the default read-only mode.
    pub fn default_read_only(mut self, read_only: bool) -> Self {
        self.default_read_only = Some(read_only);
        self
    }

    /// Sets the default isolation level by name.
    pub fn default_isolation(mut self, level: impl Into<String>) -> Self {
        self.default_isolation = Some(level.into());
        self
    }

    /// Enables statement logging.
    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Returns the live query bound, clamped to the accepted range.
    pub fn effective_max_live_queries(&self) -> usize {
        self.max_live_queries
            .clamp(MIN_MAX_LIVE_QUERIES, MAX_MAX_LIVE_QUERIES)
    }

    /// Returns the row capacity hint, capped at [`MAX_ROW_CAPACITY_HINT`].
    pub fn effective_row_capacity_hint(&self) -> usize {
        self.row_capacity_hint.min(MAX_ROW_CAPACITY_HINT)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_live_queries > MAX_MAX_LIVE_QUERIES {
            return Err(format!(
                "max_live_queries must be at most {MAX_MAX_LIVE_QUERIES}"
            ));
        }

        if self.row_capacity_hint > MAX_ROW_CAPACITY_HINT {
            return Err(format!(
                "row_capacity_hint must be at most {MAX_ROW_CAPACITY_HINT}"
            ));
        }

        Ok(())
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.max_live_queries, 16);
        assert_eq!(config.row_capacity_hint, 64);
        assert_eq!(config.default_read_only, None);
        assert!(!config.log_statements);
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new()
            .max_live_queries(0)
            .row_capacity_hint(8)
            .default_read_only(true)
            .default_isolation("SERIALIZABLE")
            .log_statements(true);

        assert_eq!(config.max_live_queries, 1);
        assert_eq!(config.row_capacity_hint, 8);
        assert_eq!(config.default_read_only, Some(true));
        assert_eq!(config.default_isolation.as_deref(), Some("SERIALIZABLE"));
        assert!(config.log_statements);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ClientConfig::from_toml("max_live_queries = 4\n").unwrap();
        assert_eq!(config.max_live_queries, 4);
        assert_eq!(config.row_capacity_hint, 64);
        assert_eq!(config.default_isolation, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("client.toml");

        let config = ClientConfig::new()
            .max_live_queries(32)
            .default_isolation("READ_COMMITTED");
        config.save(&path).unwrap();

        let loaded = ClientConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_builder_clamps_limits() {
        let config = ClientConfig::new()
            .max_live_queries(usize::MAX)
            .row_capacity_hint(usize::MAX);
        assert_eq!(config.max_live_queries, MAX_MAX_LIVE_QUERIES);
        assert_eq!(config.row_capacity_hint, MAX_ROW_CAPACITY_HINT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_limits_rejected() {
        let err = ClientConfig::from_toml("max_live_queries = 9223372036854775807").unwrap_err();
        assert!(err.to_string().contains("max_live_queries"));

        let err = ClientConfig::from_toml("row_capacity_hint = 9223372036854775807").unwrap_err();
        assert!(err.to_string().contains("row_capacity_hint"));

        let config = ClientConfig {
            max_live_queries: usize::MAX,
            row_capacity_hint: usize::MAX,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.effective_max_live_queries(), MAX_MAX_LIVE_QUERIES);
        assert_eq!(config.effective_row_capacity_hint(), MAX_ROW_CAPACITY_HINT);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ClientConfig::from_toml("max_live_queries = \"many\"").is_err());
    }
}
