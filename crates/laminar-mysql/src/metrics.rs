//! Bridge metrics types.
//!
//! Provides metrics reporting for the bridges:
//! - `ConnectorMetrics`: Point-in-time snapshot any bridge can report
//! - `MySqlSourceMetrics`: Lock-free counters for the read bridge
//! - `MySqlSinkMetrics`: Lock-free counters for the write bridge

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics reported by a bridge.
#[derive(Debug, Clone, Default)]
pub struct ConnectorMetrics {
    /// Total number of records processed.
    pub records_total: u64,

    /// Total bytes processed.
    pub bytes_total: u64,

    /// Number of errors encountered.
    pub errors_total: u64,

    /// Additional bridge-specific metrics.
    pub custom: Vec<(String, f64)>,
}

impl ConnectorMetrics {
    /// Creates empty metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom metric.
    pub fn add_custom(&mut self, name: impl Into<String>, value: f64) {
        self.custom.push((name.into(), value));
    }

    /// Looks up a custom metric by name.
    #[must_use]
    pub fn custom_value(&self, name: &str) -> Option<f64> {
        self.custom
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| *v)
    }
}

/// Atomic counters for the MySQL read bridge.
#[derive(Debug, Default)]
pub struct MySqlSourceMetrics {
    /// Total rows converted into batches.
    pub rows_read: AtomicU64,

    /// Total batches emitted.
    pub batches_emitted: AtomicU64,

    /// Total fatal stream errors.
    pub errors_total: AtomicU64,

    /// Total connection releases performed by the bridge.
    pub disconnects: AtomicU64,
}

impl MySqlSourceMetrics {
    /// Creates a new metrics instance with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one emitted batch of `rows` rows.
    pub fn record_batch(&self, rows: u64) {
        self.rows_read.fetch_add(rows, Ordering::Relaxed);
        self.batches_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a fatal stream error.
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection release.
    pub fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Converts to [`ConnectorMetrics`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_connector_metrics(&self) -> ConnectorMetrics {
        let mut m = ConnectorMetrics {
            records_total: self.rows_read.load(Ordering::Relaxed),
            bytes_total: 0,
            errors_total: self.errors_total.load(Ordering::Relaxed),
            custom: Vec::new(),
        };
        m.add_custom(
            "mysql.batches_emitted",
            self.batches_emitted.load(Ordering::Relaxed) as f64,
        );
        m.add_custom(
            "mysql.disconnects",
            self.disconnects.load(Ordering::Relaxed) as f64,
        );
        m
    }
}

/// Atomic counters for the MySQL write bridge.
#[derive(Debug, Default)]
pub struct MySqlSinkMetrics {
    /// Total rows committed.
    pub rows_written: AtomicU64,

    /// Total bytes committed (Arrow memory size of the written batches).
    pub bytes_written: AtomicU64,

    /// Total `INSERT`/`REPLACE` statements executed.
    pub statements_executed: AtomicU64,

    /// Total transactions committed.
    pub commits: AtomicU64,

    /// Total transactions rolled back.
    pub rollbacks: AtomicU64,

    /// Total failed write calls.
    pub errors_total: AtomicU64,
}

impl MySqlSinkMetrics {
    /// Creates a new metrics instance with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a committed write of `rows` rows totaling `bytes`.
    pub fn record_write(&self, rows: u64, bytes: u64) {
        self.rows_written.fetch_add(rows, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records executed statements.
    pub fn record_statements(&self, count: u64) {
        self.statements_executed.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a failed write that issued no rollback.
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed write that was rolled back.
    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Converts to [`ConnectorMetrics`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_connector_metrics(&self) -> ConnectorMetrics {
        let mut m = ConnectorMetrics {
            records_total: self.rows_written.load(Ordering::Relaxed),
            bytes_total: self.bytes_written.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            custom: Vec::new(),
        };
        m.add_custom(
            "mysql.statements_executed",
            self.statements_executed.load(Ordering::Relaxed) as f64,
        );
        m.add_custom(
            "mysql.commits",
            self.commits.load(Ordering::Relaxed) as f64,
        );
        m.add_custom(
            "mysql.rollbacks",
            self.rollbacks.load(Ordering::Relaxed) as f64,
        );
        m
    }
}
