//! Bridge error types.
//!
//! Provides a unified error hierarchy for the MySQL bridge:
//! - `ConnectorError`: Top-level error for read/write bridge operations
//! - `ValueError`: Failure converting a single external cell

use thiserror::Error;

/// Errors that can occur during bridge operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The external result set or row does not line up with the declared schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A type that has no MySQL bridge mapping.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Both replace mode and an `ON DUPLICATE KEY` clause were requested.
    #[error(
        "conflicting write mode: only one of 'replace.query' and 'on.duplicate.clause' \
         can be specified, or none of them"
    )]
    ConflictingWriteMode,

    /// Any failure reported by the external connection while running a
    /// query or statement.
    #[error("external execution failed: {0}")]
    ExternalExecution(String),

    /// A cell could not be converted to its column's storage type.
    #[error("conversion failed for column '{column}': {source}")]
    ConversionFailed {
        /// The column being filled.
        column: String,
        /// What went wrong with the value.
        #[source]
        source: ValueError,
    },

    /// Invalid bridge configuration.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Required configuration key is missing.
    #[error("missing required config: {0}")]
    MissingConfig(String),

    /// The bridge is not in the expected state.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// The expected state.
        expected: String,
        /// The actual state.
        actual: String,
    },

    /// Arrow rejected a batch or array.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

/// Errors converting one external value into column storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value is numeric but does not fit the target width.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// Text form of the offending value.
        value: String,
        /// Target column type name.
        target: &'static str,
    },

    /// Text that does not parse as the target type.
    #[error("cannot parse '{text}' as {target}")]
    Malformed {
        /// The raw text (lossily decoded).
        text: String,
        /// Target column type name.
        target: &'static str,
    },

    /// The driver produced a variant the target type does not accept.
    #[error("{found} value cannot be stored as {target}")]
    UnexpectedVariant {
        /// Variant name produced by the driver.
        found: &'static str,
        /// Target column type name.
        target: &'static str,
    },
}

impl ValueError {
    /// Attaches the column name, producing a [`ConnectorError`].
    #[must_use]
    pub fn for_column(self, column: impl Into<String>) -> ConnectorError {
        ConnectorError::ConversionFailed {
            column: column.into(),
            source: self,
        }
    }
}
