//! External connection seam.
//!
//! The bridges never open connections themselves: the caller hands them an
//! already-open [`ExternalConnection`] drawn from its own pool. Calls are
//! synchronous and block until the server round trip completes.
//!
//! [`Transaction`] scopes one write call. It rolls back on drop unless it was
//! committed or rolled back explicitly, so every exit path releases it once.

use tracing::warn;

use crate::error::ConnectorError;
use crate::value::ExternalRow;

/// A blocking connection to the external MySQL store.
///
/// A connection carries at most one open result cursor: `query` starts it,
/// `fetch_row` drains it.
pub trait ExternalConnection {
    /// Runs `sql` and opens a result cursor over its rows.
    ///
    /// Returns the names of the result set's fields.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ExternalExecution` if the server rejects the query.
    fn query(&mut self, sql: &str) -> Result<Vec<String>, ConnectorError>;

    /// Fetches the next row of the open cursor, or `None` once exhausted.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ExternalExecution` on read failure.
    fn fetch_row(&mut self) -> Result<Option<ExternalRow>, ConnectorError>;

    /// Executes a statement that returns no rows.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ExternalExecution` if the server rejects it.
    fn execute(&mut self, sql: &str) -> Result<(), ConnectorError>;

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Propagates the failure of the underlying statement.
    fn begin(&mut self) -> Result<(), ConnectorError> {
        self.execute("START TRANSACTION")
    }

    /// Commits the current transaction.
    ///
    /// # Errors
    ///
    /// Propagates the failure of the underlying statement.
    fn commit(&mut self) -> Result<(), ConnectorError> {
        self.execute("COMMIT")
    }

    /// Rolls back the current transaction.
    ///
    /// # Errors
    ///
    /// Propagates the failure of the underlying statement.
    fn rollback(&mut self) -> Result<(), ConnectorError> {
        self.execute("ROLLBACK")
    }

    /// Closes the connection, consuming the handle.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ExternalExecution` if the close handshake fails.
    fn disconnect(self) -> Result<(), ConnectorError>
    where
        Self: Sized;
}

/// State of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Statements may be executed.
    Open,
    /// Committed successfully.
    Committed,
    /// Rolled back (explicitly or on drop).
    RolledBack,
}

/// One external transaction scoped to a single write call.
pub struct Transaction<'c, C: ExternalConnection> {
    connection: &'c mut C,
    state: TransactionState,
}

impl<'c, C: ExternalConnection> Transaction<'c, C> {
    /// Begins a transaction on `connection`.
    ///
    /// # Errors
    ///
    /// Propagates the failure to start the transaction; nothing needs
    /// rolling back in that case.
    pub fn begin(connection: &'c mut C) -> Result<Self, ConnectorError> {
        connection.begin()?;
        Ok(Self {
            connection,
            state: TransactionState::Open,
        })
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Executes one statement inside the transaction.
    ///
    /// # Errors
    ///
    /// Propagates the connection's error unchanged.
    pub fn execute(&mut self, sql: &str) -> Result<(), ConnectorError> {
        self.connection.execute(sql)
    }

    /// Commits the transaction.
    ///
    /// If the commit itself fails, the guard rolls back on drop.
    ///
    /// # Errors
    ///
    /// Propagates the connection's commit error.
    pub fn commit(mut self) -> Result<(), ConnectorError> {
        self.connection.commit()?;
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Propagates the connection's rollback error.
    pub fn rollback(mut self) -> Result<(), ConnectorError> {
        self.state = TransactionState::RolledBack;
        self.connection.rollback()
    }
}

impl<C: ExternalConnection> Drop for Transaction<'_, C> {
    fn drop(&mut self) {
        if self.state == TransactionState::Open {
            self.state = TransactionState::RolledBack;
            if let Err(e) = self.connection.rollback() {
                warn!(error = %e, "rollback of abandoned transaction failed");
            }
        }
    }
}

impl<C: ExternalConnection> std::fmt::Debug for Transaction<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConnection;

    #[test]
    fn test_commit_issues_begin_and_commit() {
        let mut conn = ScriptedConnection::new();
        let mut tx = Transaction::begin(&mut conn).unwrap();
        tx.execute("INSERT INTO t VALUES (1)").unwrap();
        tx.commit().unwrap();

        assert_eq!(
            conn.statements(),
            vec!["START TRANSACTION", "INSERT INTO t VALUES (1)", "COMMIT"]
        );
    }

    #[test]
    fn test_explicit_rollback_happens_once() {
        let mut conn = ScriptedConnection::new();
        let tx = Transaction::begin(&mut conn).unwrap();
        tx.rollback().unwrap();

        assert_eq!(conn.statements(), vec!["START TRANSACTION", "ROLLBACK"]);
    }

    #[test]
    fn test_drop_rolls_back_open_transaction() {
        let mut conn = ScriptedConnection::new();
        {
            let mut tx = Transaction::begin(&mut conn).unwrap();
            tx.execute("INSERT INTO t VALUES (1)").unwrap();
            assert_eq!(tx.state(), TransactionState::Open);
        }
        assert_eq!(
            conn.statements(),
            vec!["START TRANSACTION", "INSERT INTO t VALUES (1)", "ROLLBACK"]
        );
    }

    #[test]
    fn test_failed_commit_rolls_back_on_drop() {
        let mut conn = ScriptedConnection::new();
        conn.fail_statement_matching("COMMIT", "lost connection");
        let tx = Transaction::begin(&mut conn).unwrap();
        let err = tx.commit().unwrap_err();
        assert!(matches!(err, ConnectorError::ExternalExecution(_)));

        assert_eq!(
            conn.statements(),
            vec!["START TRANSACTION", "COMMIT", "ROLLBACK"]
        );
    }

    #[test]
    fn test_failed_begin_leaves_nothing_to_roll_back() {
        let mut conn = ScriptedConnection::new();
        conn.fail_statement_matching("START TRANSACTION", "read only");
        assert!(Transaction::begin(&mut conn).is_err());
        assert_eq!(conn.statements(), vec!["START TRANSACTION"]);
    }
}
