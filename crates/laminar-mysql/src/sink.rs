//! MySQL write bridge.
//!
//! A write call splits the batch into chunks of at most
//! `max_rows_to_insert` rows, renders one `INSERT`/`REPLACE` statement per
//! chunk and executes them in split order inside a single transaction.
//! Any failure rolls the whole call back and surfaces the original error;
//! a partially applied batch is never committed.

use std::num::NonZeroUsize;

use arrow_array::RecordBatch;
use tracing::{debug, info, warn};

use crate::connection::{ExternalConnection, Transaction};
use crate::connector::WriteResult;
use crate::error::ConnectorError;
use crate::metrics::{ConnectorMetrics, MySqlSinkMetrics};
use crate::sink_config::MySqlSinkConfig;
use crate::split::split_batch;
use crate::statement::{build_insert_statement, TargetDescriptor};
use crate::values::{MySqlValuesFormatter, ValuesFormatter};

/// Writes `batch` to `target` as one transaction.
///
/// An empty batch is a no-op and opens no transaction.
///
/// # Errors
///
/// Returns the first error raised while rendering or executing a chunk,
/// after rolling back. A failed rollback is logged and does not replace
/// that error. A failed commit is returned as is.
pub fn write_in_transaction<C, F>(
    connection: &mut C,
    target: &TargetDescriptor,
    batch: &RecordBatch,
    max_rows_per_chunk: NonZeroUsize,
    formatter: &F,
) -> Result<WriteResult, ConnectorError>
where
    C: ExternalConnection,
    F: ValuesFormatter + ?Sized,
{
    run_write(connection, target, batch, max_rows_per_chunk, formatter).map_err(|f| f.error)
}

/// A failed write and whether a rollback was issued for it.
struct FailedWrite {
    error: ConnectorError,
    rolled_back: bool,
}

impl FailedWrite {
    fn before_begin(error: ConnectorError) -> Self {
        Self {
            error,
            rolled_back: false,
        }
    }

    fn rolled_back(error: ConnectorError) -> Self {
        Self {
            error,
            rolled_back: true,
        }
    }
}

fn run_write<C, F>(
    connection: &mut C,
    target: &TargetDescriptor,
    batch: &RecordBatch,
    max_rows_per_chunk: NonZeroUsize,
    formatter: &F,
) -> Result<WriteResult, FailedWrite>
where
    C: ExternalConnection,
    F: ValuesFormatter + ?Sized,
{
    if batch.num_rows() == 0 {
        return Ok(WriteResult::default());
    }

    let chunks = split_batch(batch, max_rows_per_chunk);
    let mut tx = Transaction::begin(connection).map_err(FailedWrite::before_begin)?;

    for (index, chunk) in chunks.iter().enumerate() {
        let executed =
            build_insert_statement(target, chunk, formatter).and_then(|sql| tx.execute(&sql));
        if let Err(e) = executed {
            warn!(
                chunk = index,
                chunks = chunks.len(),
                error = %e,
                "MySQL write failed, rolling back"
            );
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "MySQL rollback failed");
            }
            return Err(FailedWrite::rolled_back(e));
        }
        debug!(chunk = index, rows = chunk.num_rows(), "executed MySQL insert chunk");
    }

    // A failed commit drops the guard, which issues ROLLBACK.
    tx.commit().map_err(FailedWrite::rolled_back)?;
    Ok(WriteResult::new(
        batch.num_rows(),
        batch.get_array_memory_size() as u64,
        chunks.len(),
    ))
}

/// Write bridge bound to one remote table.
///
/// The connection is borrowed per call; the sink holds no connection state.
#[derive(Debug)]
pub struct MySqlSink<F: ValuesFormatter = MySqlValuesFormatter> {
    config: MySqlSinkConfig,
    formatter: F,
    metrics: MySqlSinkMetrics,
}

impl MySqlSink<MySqlValuesFormatter> {
    /// Creates a sink using the stock MySQL values formatter.
    #[must_use]
    pub fn new(config: MySqlSinkConfig) -> Self {
        Self::with_formatter(config, MySqlValuesFormatter)
    }
}

impl<F: ValuesFormatter> MySqlSink<F> {
    /// Creates a sink rendering tuples through `formatter`.
    #[must_use]
    pub fn with_formatter(config: MySqlSinkConfig, formatter: F) -> Self {
        info!(
            table = %config.target.qualified_table_name(),
            mode = %config.target.conflict_mode(),
            max_rows_to_insert = config.max_rows_to_insert.get(),
            "created MySQL sink"
        );
        Self {
            config,
            formatter,
            metrics: MySqlSinkMetrics::new(),
        }
    }

    /// Returns the sink configuration.
    #[must_use]
    pub fn config(&self) -> &MySqlSinkConfig {
        &self.config
    }

    /// Returns the remote target.
    #[must_use]
    pub fn target(&self) -> &TargetDescriptor {
        &self.config.target
    }

    /// Returns a snapshot of the write metrics.
    #[must_use]
    pub fn metrics(&self) -> ConnectorMetrics {
        self.metrics.to_connector_metrics()
    }

    /// Writes `batch` through `connection` in one transaction.
    ///
    /// # Errors
    ///
    /// See [`write_in_transaction`].
    pub fn write_batch<C: ExternalConnection>(
        &self,
        connection: &mut C,
        batch: &RecordBatch,
    ) -> Result<WriteResult, ConnectorError> {
        if batch.num_rows() == 0 {
            return Ok(WriteResult::default());
        }

        match run_write(
            connection,
            &self.config.target,
            batch,
            self.config.max_rows_to_insert,
            &self.formatter,
        ) {
            Ok(result) => {
                self.metrics.record_statements(result.statements as u64);
                self.metrics
                    .record_write(result.records_written as u64, result.bytes_written);
                debug!(
                    records = result.records_written,
                    statements = result.statements,
                    "committed batch to MySQL"
                );
                Ok(result)
            }
            Err(FailedWrite { error, rolled_back }) => {
                if rolled_back {
                    self.metrics.record_rollback();
                } else {
                    self.metrics.record_error();
                }
                Err(error)
            }
        }
    }
}
