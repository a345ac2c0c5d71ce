//! MySQL bulk-write statement generation.
//!
//! Renders one chunk of a batch as
//! ``INSERT INTO `db`.`table` (`a`, `b`) VALUES (..),(..);`` with the
//! conflict handling selected by the [`TargetDescriptor`].

use std::fmt;

use arrow_array::RecordBatch;

use crate::error::ConnectorError;
use crate::values::ValuesFormatter;

/// Wraps a MySQL identifier in backticks, doubling embedded backticks.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// How the remote table resolves rows whose key already exists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConflictMode {
    /// Plain `INSERT`; duplicates are a server error.
    #[default]
    None,
    /// `REPLACE` deletes the existing row first.
    Replace,
    /// `INSERT ... ON DUPLICATE KEY <clause>`.
    OnDuplicate(String),
}

impl ConflictMode {
    /// Returns the statement verb for this mode.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            ConflictMode::Replace => "REPLACE",
            ConflictMode::None | ConflictMode::OnDuplicate(_) => "INSERT",
        }
    }
}

impl fmt::Display for ConflictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictMode::None => write!(f, "insert"),
            ConflictMode::Replace => write!(f, "replace"),
            ConflictMode::OnDuplicate(clause) => write!(f, "on duplicate key {clause}"),
        }
    }
}

/// The remote table a write bridge targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    database: String,
    table: String,
    conflict_mode: ConflictMode,
}

impl TargetDescriptor {
    /// Creates a descriptor.
    ///
    /// An empty `on_duplicate_clause` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConflictingWriteMode` if `replace_query` is
    /// set together with a non-empty clause.
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        replace_query: bool,
        on_duplicate_clause: Option<&str>,
    ) -> Result<Self, ConnectorError> {
        let clause = on_duplicate_clause
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let conflict_mode = match (replace_query, clause) {
            (true, Some(_)) => return Err(ConnectorError::ConflictingWriteMode),
            (true, None) => ConflictMode::Replace,
            (false, Some(c)) => ConflictMode::OnDuplicate(c.to_string()),
            (false, None) => ConflictMode::None,
        };
        Ok(Self {
            database: database.into(),
            table: table.into(),
            conflict_mode,
        })
    }

    /// Returns the remote database name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the remote table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the conflict handling mode.
    #[must_use]
    pub fn conflict_mode(&self) -> &ConflictMode {
        &self.conflict_mode
    }

    /// Returns the quoted `` `db`.`table` `` name.
    #[must_use]
    pub fn qualified_table_name(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.database),
            quote_identifier(&self.table)
        )
    }
}

/// Renders the bulk-write statement for one chunk.
///
/// # Errors
///
/// Returns `ConnectorError::InvalidState` for a batch without rows or
/// columns, and propagates formatter errors.
pub fn build_insert_statement<F: ValuesFormatter + ?Sized>(
    target: &TargetDescriptor,
    batch: &RecordBatch,
    formatter: &F,
) -> Result<String, ConnectorError> {
    if batch.num_rows() == 0 || batch.num_columns() == 0 {
        return Err(ConnectorError::InvalidState {
            expected: "a batch with rows and columns".into(),
            actual: format!(
                "{} rows, {} columns",
                batch.num_rows(),
                batch.num_columns()
            ),
        });
    }

    let schema = batch.schema();
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| quote_identifier(f.name()))
        .collect();

    let mut sql = String::with_capacity(64 + batch.get_array_memory_size());
    sql.push_str(target.conflict_mode.verb());
    sql.push_str(" INTO ");
    sql.push_str(&target.qualified_table_name());
    sql.push_str(" (");
    sql.push_str(&columns.join(", "));
    sql.push_str(") VALUES ");
    formatter.format_values(batch, &mut sql)?;
    if let ConflictMode::OnDuplicate(clause) = &target.conflict_mode {
        sql.push_str(" ON DUPLICATE KEY ");
        sql.push_str(clause);
    }
    sql.push(';');
    Ok(sql)
}
