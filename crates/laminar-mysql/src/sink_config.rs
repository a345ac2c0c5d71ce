//! MySQL write bridge configuration.
//!
//! [`MySqlSinkConfig`] holds the remote target and chunking settings for
//! [`MySqlSink`](crate::sink::MySqlSink). Conflicting write modes are
//! rejected here, before any connection is touched.

use std::num::NonZeroUsize;

use crate::config::{ConfigKeySpec, ConnectorConfig};
use crate::error::ConnectorError;
use crate::statement::TargetDescriptor;

/// Default maximum number of rows per `INSERT` statement.
pub const DEFAULT_MAX_ROWS_TO_INSERT: usize = 65_536;

/// Configuration for the MySQL write bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlSinkConfig {
    /// Remote database and table plus conflict handling.
    pub target: TargetDescriptor,

    /// Maximum rows rendered into one statement (default: 65536).
    pub max_rows_to_insert: NonZeroUsize,
}

impl MySqlSinkConfig {
    /// Creates a config with default chunking.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConflictingWriteMode` if `replace_query` is
    /// combined with a non-empty `on_duplicate_clause`.
    pub fn new(
        database: &str,
        table: &str,
        replace_query: bool,
        on_duplicate_clause: Option<&str>,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            target: TargetDescriptor::new(database, table, replace_query, on_duplicate_clause)?,
            max_rows_to_insert: default_max_rows(),
        })
    }

    /// Parses a sink config from a [`ConnectorConfig`].
    ///
    /// # Required keys
    ///
    /// - `remote.database` - Database on the MySQL server
    /// - `remote.table` - Target table
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingConfig` if required keys are absent,
    /// `ConnectorError::ConflictingWriteMode` if both `replace.query` and
    /// `on.duplicate.clause` are given, or
    /// `ConnectorError::ConfigurationError` on invalid values.
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        config.validate(&sink_config_keys())?;

        let database = config.require("remote.database")?;
        let table = config.require("remote.table")?;
        let replace_query = config.get_bool("replace.query")?.unwrap_or(false);
        let on_duplicate_clause = config.get("on.duplicate.clause");

        let mut cfg = Self::new(database, table, replace_query, on_duplicate_clause)?;
        if let Some(rows) = config.get_parsed::<usize>("max.rows.to.insert")? {
            cfg.max_rows_to_insert = NonZeroUsize::new(rows).ok_or_else(|| {
                ConnectorError::ConfigurationError("max.rows.to.insert must be > 0".into())
            })?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingConfig` if the table name is empty.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.target.table().is_empty() {
            return Err(ConnectorError::MissingConfig("remote.table".into()));
        }
        if self.target.database().is_empty() {
            return Err(ConnectorError::MissingConfig("remote.database".into()));
        }
        Ok(())
    }
}

fn default_max_rows() -> NonZeroUsize {
    NonZeroUsize::MIN.saturating_add(DEFAULT_MAX_ROWS_TO_INSERT - 1)
}

/// Keys accepted by [`MySqlSinkConfig::from_config`].
#[must_use]
pub fn sink_config_keys() -> Vec<ConfigKeySpec> {
    vec![
        ConfigKeySpec::required("remote.database", "Database on the MySQL server"),
        ConfigKeySpec::required("remote.table", "Target table"),
        ConfigKeySpec::optional(
            "replace.query",
            "Use REPLACE INTO instead of INSERT INTO",
            "false",
        ),
        ConfigKeySpec::optional(
            "on.duplicate.clause",
            "Clause appended after ON DUPLICATE KEY",
            "",
        ),
        ConfigKeySpec::optional(
            "max.rows.to.insert",
            "Maximum rows per INSERT statement",
            DEFAULT_MAX_ROWS_TO_INSERT.to_string(),
        ),
    ]
}
