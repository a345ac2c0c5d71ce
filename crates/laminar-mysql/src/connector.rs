//! Results reported by bridge operations.

/// Result of a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteResult {
    /// Number of records committed.
    pub records_written: usize,

    /// Number of bytes written (Arrow memory size of the batch).
    pub bytes_written: u64,

    /// Number of statements executed inside the transaction.
    pub statements: usize,
}

impl WriteResult {
    /// Creates a new write result.
    #[must_use]
    pub fn new(records_written: usize, bytes_written: u64, statements: usize) -> Self {
        Self {
            records_written,
            bytes_written,
            statements,
        }
    }
}
