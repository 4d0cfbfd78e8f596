//! Error types for ordo-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Concurrent transaction touched the same rows (D003)
    #[error("[D003] Transaction conflict: {0}")]
    TransactionConflict(String),

    /// BEGIN/COMMIT/ROLLBACK failed (D004)
    #[error("[D004] Transaction error: {0}")]
    TransactionError(String),

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Result row does not hold the expected type (D007)
    #[error("[D007] Cannot read column {column} as {expected}: found {found}")]
    RowDecode {
        column: usize,
        expected: &'static str,
        found: String,
    },

    /// Query provider statement does not match its bound parameters (D008)
    #[error("[D008] Invalid query '{query}': {message}")]
    InvalidQuery { query: String, message: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Whether the error came from a write-write conflict between transactions
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::TransactionConflict(_))
    }
}

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so conflicts are
        // recognized from the message text.
        let msg = err.to_string();
        if msg.to_lowercase().contains("conflict") {
            DbError::TransactionConflict(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

/// SQLSTATE codes PostgreSQL raises when concurrent transactions collide
const PG_CONFLICT_STATES: [&str; 2] = ["40001", "40P01"];

impl DbError {
    /// Classify a PostgreSQL error by its SQLSTATE
    pub(crate) fn from_sqlstate(code: Option<&str>, message: String) -> Self {
        match code {
            Some(code) if PG_CONFLICT_STATES.contains(&code) => {
                DbError::TransactionConflict(message)
            }
            _ => DbError::ExecutionError(message),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code();
                DbError::from_sqlstate(code.as_deref(), err.to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => DbError::ConnectionError(err.to_string()),
            _ => DbError::ExecutionError(err.to_string()),
        }
    }
}
