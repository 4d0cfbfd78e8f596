//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, Transaction};
use crate::value::{Row, SqlValue};
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};
use ordo_core::DbType;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// DuckDB database backend
///
/// Holds one root connection; every operation runs on a clone of it, so
/// transactions never interleave on a shared connection.
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Short-lived connection to the same database
    fn connection(&self) -> DbResult<Connection> {
        let root = self.conn.lock().map_err(poisoned)?;
        root.try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    fn db_type(&self) -> DbType {
        DbType::DuckDb
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        execute_sync(&self.connection()?, sql, params)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        execute_batch_sync(&self.connection()?, sql)
    }

    async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
        query_rows_sync(&self.connection()?, sql, params)
    }

    async fn begin(&self) -> DbResult<Box<dyn Transaction>> {
        let conn = self.connection()?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(Box::new(DuckDbTransaction {
            conn: Mutex::new(conn),
            open: true,
        }))
    }
}

/// Transaction on a dedicated DuckDB connection
pub struct DuckDbTransaction {
    conn: Mutex<Connection>,
    open: bool,
}

impl DuckDbTransaction {
    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(poisoned)
    }

    fn finish(&mut self, statement: &str) -> DbResult<()> {
        self.open = false;
        let conn = self.conn.get_mut().map_err(poisoned)?;
        if let Err(e) = conn.execute_batch(statement) {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(match DbError::from(e) {
                DbError::ExecutionError(msg) => {
                    DbError::TransactionError(format!("{statement} failed: {msg}"))
                }
                other => other,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for DuckDbTransaction {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        execute_sync(&*self.conn()?, sql, params)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        execute_batch_sync(&*self.conn()?, sql)
    }

    async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
        query_rows_sync(&*self.conn()?, sql, params)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let mut tx = self;
        tx.finish("COMMIT")
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        let mut tx = self;
        tx.finish("ROLLBACK")
    }
}

impl Drop for DuckDbTransaction {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Ok(conn) = self.conn.get_mut() {
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                log::debug!("Rollback of abandoned transaction failed: {e}");
            }
        }
    }
}

fn poisoned<T>(err: PoisonError<T>) -> DbError {
    DbError::MutexPoisoned(err.to_string())
}

/// Attach the failing SQL to plain execution errors
fn with_sql(err: duckdb::Error, sql: &str) -> DbError {
    match DbError::from(err) {
        DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{msg}: {sql}")),
        other => other,
    }
}

fn bind(params: &[SqlValue]) -> Vec<Value> {
    params.iter().map(Value::from).collect()
}

fn execute_sync(conn: &Connection, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
    conn.execute(sql, params_from_iter(bind(params)))
        .map_err(|e| with_sql(e, sql))
}

fn execute_batch_sync(conn: &Connection, sql: &str) -> DbResult<()> {
    conn.execute_batch(sql).map_err(|e| with_sql(e, sql))
}

fn query_rows_sync(conn: &Connection, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
    let mut stmt = conn.prepare(sql).map_err(|e| with_sql(e, sql))?;
    let rows = stmt
        .query_map(params_from_iter(bind(params)), |row| {
            let col_count = row.as_ref().column_count();
            (0..col_count)
                .map(|i| row.get::<_, Value>(i).map(SqlValue::from))
                .collect::<Result<Vec<_>, _>>()
                .map(Row)
        })
        .map_err(|e| with_sql(e, sql))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| with_sql(e, sql))?;
    Ok(rows)
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
