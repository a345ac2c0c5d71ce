//! # `LaminarDB` MySQL bridge
//!
//! Moves data between MySQL tables and Arrow `RecordBatch`es.
//!
//! - [`source`] - Read bridge: result cursor to bounded columnar batches
//! - [`sink`] - Write bridge: batches to chunked `INSERT`/`REPLACE`
//!   statements committed as one transaction
//! - [`types`] - Column type map and driver value conversion
//! - [`connection`] - Blocking connection seam and transaction guard
//! - [`testing`] - Connection doubles and test helpers
//!
//! ## Data flow
//!
//! ```text
//! read:  ExternalConnection::query/fetch_row -> convert -> ColumnBuilder -> RecordBatch
//! write: RecordBatch -> split_batch -> build_insert_statement -> Transaction -> COMMIT
//! ```
//!
//! Connection acquisition, table registration and query rewriting belong to
//! the caller; the bridges receive an open connection and a finished query.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Common test patterns that are acceptable
#![cfg_attr(
    test,
    allow(
        clippy::field_reassign_with_default,
        clippy::float_cmp,
        clippy::manual_let_else,
        clippy::unreadable_literal,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        unused_mut
    )
)]

// ── Foundation ──

/// Bridge error types.
pub mod error;

/// Key-value configuration model.
pub mod config;

/// Write results.
pub mod connector;

/// Bridge metrics types.
pub mod metrics;

/// Values produced by MySQL drivers.
pub mod value;

/// Column type map and value conversion.
pub mod types;

/// Bridge schema and Arrow interop.
pub mod schema;

/// Typed column storage for batch assembly.
pub mod column;

/// External connection trait and transaction guard.
pub mod connection;

// ── Read path ──

/// Read bridge configuration.
pub mod source_config;

/// MySQL read bridge.
pub mod source;

// ── Write path ──

/// Row-bounded batch splitting.
pub mod split;

/// MySQL `VALUES` tuple rendering.
pub mod values;

/// Bulk-write statement generation.
pub mod statement;

/// Write bridge configuration.
pub mod sink_config;

/// MySQL write bridge.
pub mod sink;

/// Testing utilities (connection doubles, helpers).
pub mod testing;

pub use config::{ConfigKeySpec, ConnectorConfig};
pub use connection::{ExternalConnection, Transaction, TransactionState};
pub use connector::WriteResult;
pub use error::{ConnectorError, ValueError};
pub use metrics::ConnectorMetrics;
pub use schema::{BridgeSchema, ColumnSpec};
pub use sink::{write_in_transaction, MySqlSink};
pub use sink_config::MySqlSinkConfig;
pub use source::{MySqlSource, SourceState};
pub use source_config::MySqlSourceConfig;
pub use split::split_batch;
pub use statement::{build_insert_statement, quote_identifier, ConflictMode, TargetDescriptor};
pub use types::{convert, ColumnType, StorageValue};
pub use value::{ExternalRow, ExternalValue};
pub use values::{MySqlValuesFormatter, ValuesFormatter};
