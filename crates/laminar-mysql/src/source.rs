//! MySQL read bridge.
//!
//! [`MySqlSource`] drains an external result cursor into Arrow
//! `RecordBatch`es of at most `max_rows_per_batch` rows. Each cell is
//! converted through the type map according to the bound [`BridgeSchema`].
//!
//! # Lifecycle
//!
//! ```text
//! open ──► Streaming ──(cursor exhausted)──► Exhausted   next_batch() = Ok(None)
//!              │
//!              └──(conversion / cursor error)──► Failed   next_batch() = Err(InvalidState)
//! ```
//!
//! With `auto_close`, the connection is disconnected exactly once: when
//! exhaustion is first observed, when the stream fails, or when the source
//! is dropped, whichever comes first. A failed `open` always disconnects.

use std::fmt;
use std::num::NonZeroUsize;

use arrow_array::{RecordBatch, RecordBatchOptions};
use arrow_schema::SchemaRef;
use tracing::{debug, info, warn};

use crate::column::ColumnBuilder;
use crate::connection::ExternalConnection;
use crate::error::ConnectorError;
use crate::metrics::{ConnectorMetrics, MySqlSourceMetrics};
use crate::schema::BridgeSchema;
use crate::source_config::MySqlSourceConfig;
use crate::types::convert;

/// Upper bound on rows pre-allocated per column builder.
const MAX_PREALLOCATED_ROWS: usize = 8192;

/// Read stream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Rows may still be fetched.
    Streaming,
    /// The cursor has been drained.
    Exhausted,
    /// A fatal error aborted the stream.
    Failed,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceState::Streaming => write!(f, "Streaming"),
            SourceState::Exhausted => write!(f, "Exhausted"),
            SourceState::Failed => write!(f, "Failed"),
        }
    }
}

/// Streams rows from a MySQL result cursor as columnar batches.
pub struct MySqlSource<C: ExternalConnection> {
    /// `None` once released.
    connection: Option<C>,
    schema: BridgeSchema,
    arrow_schema: SchemaRef,
    /// One empty builder per column, cloned into fresh storage per batch.
    prototypes: Vec<ColumnBuilder>,
    max_rows_per_batch: NonZeroUsize,
    auto_close: bool,
    state: SourceState,
    metrics: MySqlSourceMetrics,
}

impl<C: ExternalConnection> MySqlSource<C> {
    /// Takes ownership of `connection` and runs `query` on it.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ExternalExecution` if the query fails and
    /// `ConnectorError::SchemaMismatch` if the result set's field count
    /// differs from `schema`. The connection is disconnected before the
    /// error is returned, whether or not `auto_close` is set, since the
    /// caller cannot get it back.
    pub fn open(
        connection: C,
        query: &str,
        schema: BridgeSchema,
        max_rows_per_batch: NonZeroUsize,
        auto_close: bool,
    ) -> Result<Self, ConnectorError> {
        let prototypes = schema
            .columns()
            .iter()
            .map(|c| ColumnBuilder::with_capacity(c.column_type, 0))
            .collect();
        let mut source = Self {
            connection: Some(connection),
            arrow_schema: schema.to_arrow(),
            schema,
            prototypes,
            max_rows_per_batch,
            auto_close,
            state: SourceState::Streaming,
            metrics: MySqlSourceMetrics::new(),
        };

        if let Err(e) = source.start(query) {
            source.auto_close = true;
            source.fail(&e);
            return Err(e);
        }

        info!(
            columns = source.schema.len(),
            max_rows_per_batch = max_rows_per_batch.get(),
            auto_close,
            "opened MySQL read stream"
        );
        Ok(source)
    }

    /// Opens a source with settings taken from a [`MySqlSourceConfig`].
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn from_config(
        connection: C,
        query: &str,
        schema: BridgeSchema,
        config: &MySqlSourceConfig,
    ) -> Result<Self, ConnectorError> {
        Self::open(
            connection,
            query,
            schema,
            config.max_block_size,
            config.auto_close,
        )
    }

    fn start(&mut self, query: &str) -> Result<(), ConnectorError> {
        let connection = self.connection.as_mut().ok_or_else(released)?;
        let fields = connection.query(query)?;
        if fields.len() != self.schema.len() {
            return Err(ConnectorError::SchemaMismatch(format!(
                "the number of columns doesn't match: result set has {}, schema declares {}",
                fields.len(),
                self.schema.len()
            )));
        }
        debug!(?fields, "MySQL result set opened");
        Ok(())
    }

    /// Returns the Arrow schema of emitted batches.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.arrow_schema.clone()
    }

    /// Returns the current stream state.
    #[must_use]
    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Returns a snapshot of the read metrics.
    #[must_use]
    pub fn metrics(&self) -> ConnectorMetrics {
        self.metrics.to_connector_metrics()
    }

    /// Reads the next batch.
    ///
    /// Returns `Ok(None)` once the cursor is exhausted; an empty batch is
    /// never produced.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConversionFailed`, `SchemaMismatch` or
    /// `ExternalExecution` when a row cannot be read. The stream is then
    /// failed and later calls return `ConnectorError::InvalidState`.
    pub fn next_batch(&mut self) -> Result<Option<RecordBatch>, ConnectorError> {
        match self.state {
            SourceState::Streaming => {}
            SourceState::Exhausted => return Ok(None),
            SourceState::Failed => {
                return Err(ConnectorError::InvalidState {
                    expected: SourceState::Streaming.to_string(),
                    actual: SourceState::Failed.to_string(),
                })
            }
        }

        match self.read_batch() {
            Ok((batch, exhausted)) => {
                if exhausted {
                    self.state = SourceState::Exhausted;
                    info!(
                        rows_total = self.metrics.to_connector_metrics().records_total,
                        "MySQL read stream exhausted"
                    );
                    self.release();
                }
                Ok(batch)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Fills one batch; the flag reports whether the cursor ran dry.
    fn read_batch(&mut self) -> Result<(Option<RecordBatch>, bool), ConnectorError> {
        let max_rows = self.max_rows_per_batch.get();
        let capacity = max_rows.min(MAX_PREALLOCATED_ROWS);
        let mut builders: Vec<ColumnBuilder> = self
            .prototypes
            .iter()
            .map(|p| p.empty_like(capacity))
            .collect();

        let connection = self.connection.as_mut().ok_or_else(released)?;
        let mut rows = 0;
        let mut exhausted = false;
        while rows < max_rows {
            let Some(row) = connection.fetch_row()? else {
                exhausted = true;
                break;
            };
            if row.len() != builders.len() {
                return Err(ConnectorError::SchemaMismatch(format!(
                    "row has {} fields, schema declares {}",
                    row.len(),
                    builders.len()
                )));
            }
            for ((builder, spec), value) in builders
                .iter_mut()
                .zip(self.schema.columns())
                .zip(&row)
            {
                if value.is_null() {
                    if spec.nullable {
                        builder.append_null();
                    } else {
                        builder.append_default()?;
                    }
                } else {
                    let converted =
                        convert(spec.column_type, value).map_err(|e| e.for_column(&spec.name))?;
                    builder.append(converted)?;
                }
            }
            rows += 1;
        }

        if rows == 0 {
            return Ok((None, exhausted));
        }

        let columns = builders.iter_mut().map(ColumnBuilder::finish).collect();
        let batch = RecordBatch::try_new_with_options(
            self.arrow_schema.clone(),
            columns,
            &RecordBatchOptions::new().with_row_count(Some(rows)),
        )?;
        self.metrics.record_batch(rows as u64);
        debug!(rows, "read batch from MySQL");
        Ok((Some(batch), exhausted))
    }

    fn fail(&mut self, error: &ConnectorError) {
        self.state = SourceState::Failed;
        self.metrics.record_error();
        warn!(error = %error, "MySQL read stream failed");
        self.release();
    }

    /// Disconnects once, and only when `auto_close` is set.
    fn release(&mut self) {
        if !self.auto_close {
            return;
        }
        if let Some(connection) = self.connection.take() {
            self.metrics.record_disconnect();
            match connection.disconnect() {
                Ok(()) => debug!("MySQL connection released"),
                Err(e) => warn!(error = %e, "failed to disconnect MySQL connection"),
            }
        }
    }

    /// Returns the connection to the caller.
    ///
    /// Yields `None` if the source already released it through `auto_close`.
    #[must_use]
    pub fn into_connection(mut self) -> Option<C> {
        self.connection.take()
    }
}

fn released() -> ConnectorError {
    ConnectorError::InvalidState {
        expected: "open connection".into(),
        actual: "released".into(),
    }
}

impl<C: ExternalConnection> Iterator for MySqlSource<C> {
    type Item = Result<RecordBatch, ConnectorError>;

    /// Yields batches until exhaustion; a failure is yielded once, then the
    /// iterator ends.
    fn next(&mut self) -> Option<Self::Item> {
        if self.state == SourceState::Failed {
            return None;
        }
        self.next_batch().transpose()
    }
}

impl<C: ExternalConnection> Drop for MySqlSource<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: ExternalConnection> fmt::Debug for MySqlSource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlSource")
            .field("schema", &self.schema)
            .field("max_rows_per_batch", &self.max_rows_per_batch)
            .field("auto_close", &self.auto_close)
            .field("state", &self.state)
            .field("connected", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::cast::AsArray;
    use arrow_array::types::{Float64Type, UInt32Type};
    use arrow_array::Array;

    use crate::schema::ColumnSpec;
    use crate::testing::{mock_schema, text_row, ScriptedConnection};
    use crate::types::ColumnType;
    use crate::value::{ExternalRow, ExternalValue};

    fn rows(n: usize) -> Vec<ExternalRow> {
        (0..n)
            .map(|i| {
                let id = i.to_string();
                let name = format!("user_{i}");
                text_row(&[Some(id.as_str()), Some(name.as_str()), Some("1.5")])
            })
            .collect()
    }

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn open(
        conn: &ScriptedConnection,
        max_rows: usize,
        auto_close: bool,
    ) -> MySqlSource<ScriptedConnection> {
        MySqlSource::open(
            conn.clone(),
            "SELECT `id`, `name`, `score` FROM `db`.`t`",
            mock_schema(),
            limit(max_rows),
            auto_close,
        )
        .unwrap()
    }

    #[test]
    fn test_batches_are_bounded() {
        let conn = ScriptedConnection::with_result(&["id", "name", "score"], rows(5));
        let mut source = open(&conn, 2, false);

        let sizes: Vec<usize> = std::iter::from_fn(|| source.next_batch().unwrap())
            .map(|b| b.num_rows())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(source.state(), SourceState::Exhausted);
        assert!(source.next_batch().unwrap().is_none());
        assert_eq!(source.metrics().records_total, 5);
    }

    #[test]
    fn test_values_are_converted() {
        let conn = ScriptedConnection::with_result(
            &["id", "name", "score"],
            vec![text_row(&[Some("42"), Some("alice"), Some("2.25")])],
        );
        let mut source = open(&conn, 10, false);
        let batch = source.next_batch().unwrap().unwrap();

        assert_eq!(batch.column(0).as_primitive::<UInt32Type>().value(0), 42);
        assert_eq!(batch.column(1).as_binary::<i32>().value(0), b"alice");
        assert_eq!(batch.column(2).as_primitive::<Float64Type>().value(0), 2.25);
        assert_eq!(conn.queries(), vec!["SELECT `id`, `name`, `score` FROM `db`.`t`"]);
    }

    #[test]
    fn test_null_handling() {
        let conn = ScriptedConnection::with_result(
            &["id", "name", "score"],
            vec![text_row(&[None, None, Some("3")])],
        );
        let mut source = open(&conn, 10, false);
        let batch = source.next_batch().unwrap().unwrap();

        // Non-nullable column takes the type default without a null marker.
        let ids = batch.column(0).as_primitive::<UInt32Type>();
        assert!(ids.is_valid(0));
        assert_eq!(ids.value(0), 0);

        let names = batch.column(1).as_binary::<i32>();
        assert!(names.is_null(0));
    }

    #[test]
    fn test_string_column_keeps_raw_bytes() {
        let schema = BridgeSchema::new(vec![ColumnSpec::new("blob", ColumnType::String, false)]);
        let conn = ScriptedConnection::with_result(
            &["blob"],
            vec![vec![ExternalValue::Bytes(vec![0xff, 0x00, 0x80])]],
        );
        let mut source =
            MySqlSource::open(conn, "SELECT `blob` FROM `db`.`t`", schema, limit(10), false)
                .unwrap();

        let batch = source.next_batch().unwrap().unwrap();
        assert_eq!(batch.column(0).as_binary::<i32>().value(0), &[0xffu8, 0x00, 0x80]);
        assert!(source.next_batch().unwrap().is_none());
        assert_eq!(source.state(), SourceState::Exhausted);
    }

    #[test]
    fn test_empty_result_set() {
        let conn = ScriptedConnection::with_result(&["id", "name", "score"], vec![]);
        let mut source = open(&conn, 10, true);
        assert!(source.next_batch().unwrap().is_none());
        assert!(source.next_batch().unwrap().is_none());
        assert_eq!(conn.disconnect_count(), 1);
    }

    #[test]
    fn test_auto_close_at_first_observed_exhaustion() {
        let conn = ScriptedConnection::with_result(&["id", "name", "score"], rows(4));
        let mut source = open(&conn, 2, true);

        assert_eq!(source.next_batch().unwrap().unwrap().num_rows(), 2);
        assert_eq!(source.next_batch().unwrap().unwrap().num_rows(), 2);
        assert_eq!(conn.disconnect_count(), 0);

        assert!(source.next_batch().unwrap().is_none());
        assert_eq!(conn.disconnect_count(), 1);
        drop(source);
        assert_eq!(conn.disconnect_count(), 1);
    }

    #[test]
    fn test_auto_close_with_short_final_batch() {
        let conn = ScriptedConnection::with_result(&["id", "name", "score"], rows(3));
        let mut source = open(&conn, 2, true);

        source.next_batch().unwrap().unwrap();
        assert_eq!(source.next_batch().unwrap().unwrap().num_rows(), 1);
        assert_eq!(conn.disconnect_count(), 1);
        assert!(source.next_batch().unwrap().is_none());
        assert_eq!(conn.disconnect_count(), 1);
    }

    #[test]
    fn test_without_auto_close_connection_is_returned() {
        let conn = ScriptedConnection::with_result(&["id", "name", "score"], rows(1));
        let mut source = open(&conn, 10, false);
        while source.next_batch().unwrap().is_some() {}
        assert!(source.into_connection().is_some());
        assert_eq!(conn.disconnect_count(), 0);
    }

    #[test]
    fn test_field_count_mismatch() {
        let conn = ScriptedConnection::with_result(&["id", "name"], rows(1));
        let err = MySqlSource::open(conn.clone(), "SELECT 1", mock_schema(), limit(10), true)
            .unwrap_err();
        assert!(matches!(err, ConnectorError::SchemaMismatch(_)));
        assert_eq!(conn.disconnect_count(), 1);
    }

    #[test]
    fn test_query_failure_disconnects_without_auto_close() {
        let conn = ScriptedConnection::new();
        conn.fail_query("Table 'db.t' doesn't exist");
        let err = MySqlSource::open(conn.clone(), "SELECT 1", mock_schema(), limit(10), false)
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ExternalExecution(_)));
        assert_eq!(conn.disconnect_count(), 1);
    }

    #[test]
    fn test_field_count_mismatch_disconnects_without_auto_close() {
        let conn = ScriptedConnection::with_result(&["id"], rows(1));
        let opened = MySqlSource::open(conn.clone(), "SELECT 1", mock_schema(), limit(10), false);
        assert!(matches!(opened, Err(ConnectorError::SchemaMismatch(_))));
        assert_eq!(conn.disconnect_count(), 1);
    }

    #[test]
    fn test_conversion_failure_fails_stream() {
        let conn = ScriptedConnection::with_result(
            &["id", "name", "score"],
            vec![
                text_row(&[Some("1"), Some("a"), None]),
                text_row(&[Some("-5"), Some("b"), None]),
            ],
        );
        let mut source = open(&conn, 10, true);

        let err = source.next_batch().unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::ConversionFailed { ref column, .. } if column == "id"
        ));
        assert_eq!(source.state(), SourceState::Failed);
        assert_eq!(conn.disconnect_count(), 1);

        assert!(matches!(
            source.next_batch().unwrap_err(),
            ConnectorError::InvalidState { .. }
        ));
        drop(source);
        assert_eq!(conn.disconnect_count(), 1);
    }

    #[test]
    fn test_cursor_error_fails_stream() {
        let conn = ScriptedConnection::with_result(&["id", "name", "score"], rows(1));
        conn.push_fetch_error("Lost connection to MySQL server during query");
        let mut source = open(&conn, 10, false);

        assert!(matches!(
            source.next_batch().unwrap_err(),
            ConnectorError::ExternalExecution(_)
        ));
        assert_eq!(source.metrics().errors_total, 1);
    }

    #[test]
    fn test_row_width_mismatch() {
        let conn = ScriptedConnection::with_result(
            &["id", "name", "score"],
            vec![text_row(&[Some("1"), Some("a")])],
        );
        let mut source = open(&conn, 10, false);
        assert!(matches!(
            source.next_batch().unwrap_err(),
            ConnectorError::SchemaMismatch(_)
        ));
    }

    #[test]
    fn test_drop_before_exhaustion_releases_once() {
        let conn = ScriptedConnection::with_result(&["id", "name", "score"], rows(10));
        let mut source = open(&conn, 2, true);
        source.next_batch().unwrap();
        drop(source);
        assert_eq!(conn.disconnect_count(), 1);
    }

    #[test]
    fn test_iterator() {
        let conn = ScriptedConnection::with_result(&["id", "name", "score"], rows(7));
        let source = open(&conn, 3, false);
        let batches: Vec<RecordBatch> = source.collect::<Result<_, _>>().unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(RecordBatch::num_rows).sum::<usize>(), 7);
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let conn = ScriptedConnection::with_result(
            &["id", "name", "score"],
            vec![text_row(&[Some("x"), None, None])],
        );
        let mut source = open(&conn, 10, false);
        assert!(source.next().unwrap().is_err());
        assert!(source.next().is_none());
    }

    #[test]
    fn test_from_config() {
        let conn = ScriptedConnection::with_result(&["id", "name", "score"], rows(3));
        let config = MySqlSourceConfig {
            max_block_size: limit(2),
            auto_close: true,
        };
        let mut source =
            MySqlSource::from_config(conn.clone(), "SELECT 1", mock_schema(), &config).unwrap();
        assert_eq!(source.schema().fields().len(), 3);
        assert_eq!(source.next_batch().unwrap().unwrap().num_rows(), 2);
    }
}
