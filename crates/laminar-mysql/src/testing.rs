//! Testing utilities for bridge implementations.
//!
//! Provides connection doubles that need no MySQL server:
//!
//! - [`ScriptedConnection`]: replays a scripted result set, records every
//!   statement, and fails on demand.
//! - [`InMemoryMySql`]: a single in-memory table that applies the bridge's
//!   `INSERT`/`REPLACE` statements transactionally and serves its committed
//!   rows back through the cursor in text-protocol form.
//!
//! Both are cheap to clone; clones share state, so a test can keep a handle
//! after moving the connection into a bridge.

use std::collections::VecDeque;
use std::sync::Arc;

use arrow_array::{BinaryArray, Float64Array, RecordBatch, UInt32Array};
use arrow_schema::SchemaRef;
use parking_lot::Mutex;

use crate::connection::ExternalConnection;
use crate::error::ConnectorError;
use crate::schema::{BridgeSchema, ColumnSpec};
use crate::types::ColumnType;
use crate::value::{ExternalRow, ExternalValue};

/// Creates a test schema: `id UInt32`, `name Nullable(String)`, `score Nullable(Float64)`.
#[must_use]
pub fn mock_schema() -> BridgeSchema {
    BridgeSchema::new(vec![
        ColumnSpec::new("id", ColumnType::UInt32, false),
        ColumnSpec::new("name", ColumnType::String, true),
        ColumnSpec::new("score", ColumnType::Float64, true),
    ])
}

/// Creates a test batch with `n` rows matching [`mock_schema`].
///
/// Every third `name` is NULL.
///
/// # Panics
///
/// Panics if the batch cannot be created (should not happen with valid inputs).
#[must_use]
pub fn mock_batch(n: usize) -> RecordBatch {
    let schema: SchemaRef = mock_schema().to_arrow();
    #[allow(clippy::cast_possible_truncation)]
    let ids: Vec<u32> = (0..n as u32).collect();
    let names: BinaryArray = (0..n)
        .map(|i| (i % 3 != 2).then(|| format!("user_{i}").into_bytes()))
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let scores: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64 * 1.5)).collect();

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(UInt32Array::from(ids)),
            Arc::new(names),
            Arc::new(Float64Array::from(scores)),
        ],
    )
    .unwrap()
}

/// Builds a text-protocol row from optional cell texts.
#[must_use]
pub fn text_row(cells: &[Option<&str>]) -> ExternalRow {
    cells.iter().map(|c| ExternalValue::from(*c)).collect()
}

// ── ScriptedConnection ──────────────────────────────────────────────

#[derive(Debug, Default)]
struct ScriptState {
    fields: Vec<String>,
    rows: VecDeque<Result<ExternalRow, String>>,
    queries: Vec<String>,
    statements: Vec<String>,
    failing_patterns: Vec<(String, String)>,
    failing_number: Option<(usize, String)>,
    query_failure: Option<String>,
    disconnects: usize,
}

/// Connection double replaying a scripted result set.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnection {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedConnection {
    /// Creates a connection with an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connection whose next query yields `rows` under `fields`.
    #[must_use]
    pub fn with_result(fields: &[&str], rows: Vec<ExternalRow>) -> Self {
        let conn = Self::new();
        {
            let mut state = conn.state.lock();
            state.fields = fields.iter().map(|f| (*f).to_string()).collect();
            state.rows = rows.into_iter().map(Ok).collect();
        }
        conn
    }

    /// Appends a row to the scripted cursor.
    pub fn push_row(&self, row: ExternalRow) {
        self.state.lock().rows.push_back(Ok(row));
    }

    /// Appends a cursor read failure at the current end of the script.
    pub fn push_fetch_error(&self, message: &str) {
        self.state.lock().rows.push_back(Err(message.to_string()));
    }

    /// Makes the query itself fail.
    pub fn fail_query(&self, message: &str) {
        self.state.lock().query_failure = Some(message.to_string());
    }

    /// Fails every statement containing `pattern`.
    pub fn fail_statement_matching(&self, pattern: &str, message: &str) {
        self.state
            .lock()
            .failing_patterns
            .push((pattern.to_string(), message.to_string()));
    }

    /// Fails the `n`-th executed statement (1-based, counting every statement).
    pub fn fail_statement_number(&self, n: usize, message: &str) {
        self.state.lock().failing_number = Some((n, message.to_string()));
    }

    /// Returns every statement executed so far, including failed ones.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().statements.clone()
    }

    /// Returns every query opened so far.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.state.lock().queries.clone()
    }

    /// Returns how many times the connection was disconnected.
    #[must_use]
    pub fn disconnect_count(&self) -> usize {
        self.state.lock().disconnects
    }
}

impl ExternalConnection for ScriptedConnection {
    fn query(&mut self, sql: &str) -> Result<Vec<String>, ConnectorError> {
        let mut state = self.state.lock();
        state.queries.push(sql.to_string());
        if let Some(message) = state.query_failure.clone() {
            return Err(ConnectorError::ExternalExecution(message));
        }
        Ok(state.fields.clone())
    }

    fn fetch_row(&mut self) -> Result<Option<ExternalRow>, ConnectorError> {
        match self.state.lock().rows.pop_front() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(message)) => Err(ConnectorError::ExternalExecution(message)),
            None => Ok(None),
        }
    }

    fn execute(&mut self, sql: &str) -> Result<(), ConnectorError> {
        let mut state = self.state.lock();
        state.statements.push(sql.to_string());
        let number = state.statements.len();
        if let Some((n, message)) = &state.failing_number {
            if *n == number {
                return Err(ConnectorError::ExternalExecution(message.clone()));
            }
        }
        if let Some((_, message)) = state
            .failing_patterns
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            return Err(ConnectorError::ExternalExecution(message.clone()));
        }
        Ok(())
    }

    fn disconnect(self) -> Result<(), ConnectorError> {
        self.state.lock().disconnects += 1;
        Ok(())
    }
}

// ── InMemoryMySql ───────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TableState {
    columns: Vec<String>,
    primary_key: Option<usize>,
    committed: Vec<ExternalRow>,
    staged: Option<Vec<ExternalRow>>,
    cursor: VecDeque<ExternalRow>,
    statements: Vec<String>,
    writes_seen: usize,
    failing_write: Option<(usize, String)>,
    disconnects: usize,
}

/// In-memory single-table MySQL double.
///
/// Understands the statements the write bridge renders:
/// `START TRANSACTION`, `COMMIT`, `ROLLBACK`, and
/// `INSERT|REPLACE INTO ... VALUES ...[ ON DUPLICATE KEY ...];`.
/// With a primary key, `REPLACE` overwrites the row with the same key, a
/// plain `INSERT` of an existing key fails with a duplicate-entry error, and
/// `INSERT ... ON DUPLICATE KEY` keeps the existing row. The clause text
/// itself is not evaluated.
///
/// String literals are stored as raw bytes; `X'..'` hex literals are
/// decoded.
///
/// Any query returns all committed rows as text-protocol cells.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMySql {
    state: Arc<Mutex<TableState>>,
}

impl InMemoryMySql {
    /// Creates an empty table with the given columns.
    #[must_use]
    pub fn new(columns: &[&str]) -> Self {
        let table = Self::default();
        table.state.lock().columns = columns.iter().map(|c| (*c).to_string()).collect();
        table
    }

    /// Declares `column` as the table's primary key.
    ///
    /// # Panics
    ///
    /// Panics if the column does not exist.
    #[must_use]
    pub fn with_primary_key(self, column: &str) -> Self {
        {
            let mut state = self.state.lock();
            let idx = state
                .columns
                .iter()
                .position(|c| c == column)
                .unwrap();
            state.primary_key = Some(idx);
        }
        self
    }

    /// Fails the `n`-th `INSERT`/`REPLACE` statement (1-based).
    pub fn fail_write_number(&self, n: usize, message: &str) {
        self.state.lock().failing_write = Some((n, message.to_string()));
    }

    /// Returns the committed rows.
    #[must_use]
    pub fn rows(&self) -> Vec<ExternalRow> {
        self.state.lock().committed.clone()
    }

    /// Returns the number of committed rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.state.lock().committed.len()
    }

    /// Returns every statement executed so far.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().statements.clone()
    }

    /// Returns how many times the connection was disconnected.
    #[must_use]
    pub fn disconnect_count(&self) -> usize {
        self.state.lock().disconnects
    }
}

impl ExternalConnection for InMemoryMySql {
    fn query(&mut self, _sql: &str) -> Result<Vec<String>, ConnectorError> {
        let mut state = self.state.lock();
        state.cursor = state
            .committed
            .iter()
            .map(|row| row.iter().map(to_text_protocol).collect())
            .collect();
        Ok(state.columns.clone())
    }

    fn fetch_row(&mut self) -> Result<Option<ExternalRow>, ConnectorError> {
        Ok(self.state.lock().cursor.pop_front())
    }

    fn execute(&mut self, sql: &str) -> Result<(), ConnectorError> {
        let mut state = self.state.lock();
        state.statements.push(sql.to_string());

        match sql.trim() {
            "START TRANSACTION" => {
                if state.staged.is_some() {
                    return Err(ConnectorError::ExternalExecution(
                        "transaction already open".into(),
                    ));
                }
                state.staged = Some(state.committed.clone());
                Ok(())
            }
            "COMMIT" => {
                if let Some(staged) = state.staged.take() {
                    state.committed = staged;
                }
                Ok(())
            }
            "ROLLBACK" => {
                state.staged = None;
                Ok(())
            }
            _ => {
                state.writes_seen += 1;
                if let Some((n, message)) = &state.failing_write {
                    if *n == state.writes_seen {
                        return Err(ConnectorError::ExternalExecution(message.clone()));
                    }
                }
                let write = parse_write(sql).map_err(ConnectorError::ExternalExecution)?;
                let TableState {
                    columns,
                    primary_key,
                    committed,
                    staged,
                    ..
                } = &mut *state;
                let target = staged.as_mut().unwrap_or(committed);
                apply_write(target, columns, *primary_key, write)
                    .map_err(ConnectorError::ExternalExecution)
            }
        }
    }

    fn disconnect(self) -> Result<(), ConnectorError> {
        self.state.lock().disconnects += 1;
        Ok(())
    }
}

fn to_text_protocol(value: &ExternalValue) -> ExternalValue {
    match value {
        ExternalValue::Null => ExternalValue::Null,
        ExternalValue::Bytes(b) => ExternalValue::Bytes(b.clone()),
        other => ExternalValue::Bytes(other.to_string().into_bytes()),
    }
}

/// A parsed `INSERT`/`REPLACE` statement.
#[derive(Debug)]
struct ParsedWrite {
    replace: bool,
    on_duplicate: bool,
    columns: Vec<String>,
    rows: Vec<ExternalRow>,
}

fn apply_write(
    rows: &mut Vec<ExternalRow>,
    columns: &[String],
    primary_key: Option<usize>,
    write: ParsedWrite,
) -> Result<(), String> {
    let positions = write
        .columns
        .iter()
        .map(|name| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| format!("Unknown column '{name}' in 'field list'"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for tuple in write.rows {
        if tuple.len() != positions.len() {
            return Err("Column count doesn't match value count".to_string());
        }
        let mut row = vec![ExternalValue::Null; columns.len()];
        for (pos, value) in positions.iter().zip(tuple) {
            row[*pos] = value;
        }

        if let Some(pk) = primary_key {
            if let Some(existing) = rows.iter().position(|r| r[pk] == row[pk]) {
                if write.replace {
                    rows.remove(existing);
                } else if write.on_duplicate {
                    continue;
                } else {
                    return Err(format!("Duplicate entry '{}' for key 'PRIMARY'", row[pk]));
                }
            }
        }
        rows.push(row);
    }
    Ok(())
}

struct SqlCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl SqlCursor<'_> {
    fn skip_ws(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.bytes[self.pos..].starts_with(token.as_bytes()) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), String> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(format!("expected '{token}' at offset {}", self.pos))
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        self.expect("`")?;
        let mut out = Vec::new();
        loop {
            match self.bytes.get(self.pos) {
                Some(b'`') if self.bytes.get(self.pos + 1) == Some(&b'`') => {
                    out.push(b'`');
                    self.pos += 2;
                }
                Some(b'`') => {
                    self.pos += 1;
                    break;
                }
                Some(b) => {
                    out.push(*b);
                    self.pos += 1;
                }
                None => return Err("unterminated identifier".to_string()),
            }
        }
        String::from_utf8(out).map_err(|e| e.to_string())
    }

    fn literal(&mut self) -> Result<ExternalValue, String> {
        if self.eat("NULL") {
            return Ok(ExternalValue::Null);
        }
        if self.eat("X'") {
            return self.hex_literal();
        }
        if self.eat("'") {
            let mut out = Vec::new();
            loop {
                match self.bytes.get(self.pos) {
                    Some(b'\\') => {
                        let escaped = self
                            .bytes
                            .get(self.pos + 1)
                            .ok_or_else(|| "dangling escape".to_string())?;
                        out.push(match escaped {
                            b'0' => 0,
                            b'n' => b'\n',
                            b'r' => b'\r',
                            b't' => b'\t',
                            b'b' => 0x08,
                            b'Z' => 0x1a,
                            other => *other,
                        });
                        self.pos += 2;
                    }
                    Some(b'\'') if self.bytes.get(self.pos + 1) == Some(&b'\'') => {
                        out.push(b'\'');
                        self.pos += 2;
                    }
                    Some(b'\'') => {
                        self.pos += 1;
                        return Ok(ExternalValue::Bytes(out));
                    }
                    Some(b) => {
                        out.push(*b);
                        self.pos += 1;
                    }
                    None => return Err("unterminated string literal".to_string()),
                }
            }
        }
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| !matches!(b, b',' | b')') && !b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("expected literal at offset {start}"));
        }
        Ok(ExternalValue::Bytes(self.bytes[start..self.pos].to_vec()))
    }

    fn hex_literal(&mut self) -> Result<ExternalValue, String> {
        let start = self.pos;
        let len = self.bytes[start..]
            .iter()
            .position(|b| *b == b'\'')
            .ok_or_else(|| "unterminated hex literal".to_string())?;
        let digits = &self.bytes[start..start + len];
        if digits.len() % 2 != 0 {
            return Err(format!("odd hex literal length at offset {start}"));
        }
        let out = digits
            .chunks(2)
            .map(|pair| {
                std::str::from_utf8(pair)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| format!("bad hex digit at offset {start}"))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        self.pos = start + len + 1;
        Ok(ExternalValue::Bytes(out))
    }
}

fn parse_write(sql: &str) -> Result<ParsedWrite, String> {
    let mut cur = SqlCursor {
        bytes: sql.as_bytes(),
        pos: 0,
    };

    let replace = if cur.eat("REPLACE INTO") {
        true
    } else if cur.eat("INSERT INTO") {
        false
    } else {
        return Err(format!("unsupported statement: {sql}"));
    };

    cur.ident()?;
    cur.expect(".")?;
    cur.ident()?;

    cur.expect("(")?;
    let mut columns = vec![cur.ident()?];
    while cur.eat(",") {
        columns.push(cur.ident()?);
    }
    cur.expect(")")?;
    cur.expect("VALUES")?;

    let mut rows = Vec::new();
    loop {
        cur.expect("(")?;
        let mut row = vec![cur.literal()?];
        while cur.eat(",") {
            row.push(cur.literal()?);
        }
        cur.expect(")")?;
        rows.push(row);
        if !cur.eat(",") {
            break;
        }
    }

    let on_duplicate = cur.eat("ON DUPLICATE KEY");
    Ok(ParsedWrite {
        replace,
        on_duplicate,
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_batch_shape() {
        let batch = mock_batch(5);
        assert_eq!(batch.num_rows(), 5);
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.column(1).null_count(), 1);
    }

    #[test]
    fn test_scripted_cursor_replays_rows() {
        let mut conn = ScriptedConnection::with_result(
            &["id"],
            vec![text_row(&[Some("1")]), text_row(&[None])],
        );
        assert_eq!(conn.query("SELECT id FROM t").unwrap(), vec!["id"]);
        assert_eq!(conn.fetch_row().unwrap(), Some(text_row(&[Some("1")])));
        assert_eq!(conn.fetch_row().unwrap(), Some(vec![ExternalValue::Null]));
        assert_eq!(conn.fetch_row().unwrap(), None);
        assert_eq!(conn.queries(), vec!["SELECT id FROM t"]);
    }

    #[test]
    fn test_scripted_fetch_error() {
        let mut conn = ScriptedConnection::with_result(&["id"], vec![]);
        conn.push_fetch_error("connection reset");
        conn.query("SELECT 1").unwrap();
        assert!(matches!(
            conn.fetch_row(),
            Err(ConnectorError::ExternalExecution(_))
        ));
    }

    #[test]
    fn test_scripted_statement_failure_by_number() {
        let mut conn = ScriptedConnection::new();
        conn.fail_statement_number(2, "boom");
        assert!(conn.execute("a").is_ok());
        assert!(conn.execute("b").is_err());
        assert!(conn.execute("c").is_ok());
    }

    #[test]
    fn test_parse_write() {
        let write = parse_write(
            "REPLACE INTO `db`.`t` (`id`, `we``ird`) VALUES (1,'it\\'s'),(2,NULL) \
             ON DUPLICATE KEY UPDATE x=1;",
        )
        .unwrap();
        assert!(write.replace);
        assert!(write.on_duplicate);
        assert_eq!(write.columns, vec!["id", "we`ird"]);
        assert_eq!(write.rows.len(), 2);
        assert_eq!(write.rows[0][1], ExternalValue::Bytes(b"it's".to_vec()));
        assert_eq!(write.rows[1][1], ExternalValue::Null);
    }

    #[test]
    fn test_parse_hex_literal() {
        let write =
            parse_write("INSERT INTO `db`.`t` (`raw`) VALUES (X'ff0080'),(X'');").unwrap();
        assert_eq!(write.rows[0][0], ExternalValue::Bytes(vec![0xff, 0x00, 0x80]));
        assert_eq!(write.rows[1][0], ExternalValue::Bytes(Vec::new()));
        assert!(parse_write("INSERT INTO `db`.`t` (`raw`) VALUES (X'f');").is_err());
    }

    #[test]
    fn test_in_memory_commit_and_rollback() {
        let mut table = InMemoryMySql::new(&["id", "name"]);
        table.execute("START TRANSACTION").unwrap();
        table
            .execute("INSERT INTO `db`.`t` (`id`, `name`) VALUES (1,'a');")
            .unwrap();
        table.execute("ROLLBACK").unwrap();
        assert_eq!(table.row_count(), 0);

        table.execute("START TRANSACTION").unwrap();
        table
            .execute("INSERT INTO `db`.`t` (`id`, `name`) VALUES (1,'a');")
            .unwrap();
        table.execute("COMMIT").unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_in_memory_primary_key() {
        let mut table = InMemoryMySql::new(&["id", "name"]).with_primary_key("id");
        table
            .execute("INSERT INTO `db`.`t` (`id`, `name`) VALUES (1,'a');")
            .unwrap();
        assert!(table
            .execute("INSERT INTO `db`.`t` (`id`, `name`) VALUES (1,'b');")
            .is_err());
        table
            .execute("REPLACE INTO `db`.`t` (`id`, `name`) VALUES (1,'c');")
            .unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows()[0][1], ExternalValue::Bytes(b"c".to_vec()));
    }
}
