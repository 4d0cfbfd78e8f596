//! PostgreSQL database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, Transaction};
use crate::value::{Row, SqlValue};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ordo_core::DbType;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo};
use tokio::sync::Mutex;

/// Connections kept by the pool; a cycle never uses more than two at once
const MAX_CONNECTIONS: u32 = 4;

/// PostgreSQL database backend over a small `sqlx` pool
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect to a `postgres://` URL
    pub async fn connect(url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", redact(url))))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PostgresBackend {
    fn db_type(&self) -> DbType {
        DbType::Postgres
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let done = bind(sql, params)
            .execute(&self.pool)
            .await
            .map_err(|e| with_sql(e, sql))?;
        Ok(affected(done.rows_affected()))
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| with_sql(e, sql))?;
        Ok(())
    }

    async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
        let rows = bind(sql, params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| with_sql(e, sql))?;
        rows.iter().map(decode_row).collect()
    }

    async fn begin(&self) -> DbResult<Box<dyn Transaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(Box::new(PostgresTransaction {
            tx: Mutex::new(Some(tx)),
        }))
    }
}

/// Transaction on a pooled connection.
///
/// `sqlx` rolls back a transaction dropped without commit.
pub struct PostgresTransaction {
    tx: Mutex<Option<sqlx::Transaction<'static, Postgres>>>,
}

type PgTx = sqlx::Transaction<'static, Postgres>;

fn open(slot: &mut Option<PgTx>) -> DbResult<&mut PgTx> {
    slot.as_mut().ok_or_else(finished)
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let mut slot = self.tx.lock().await;
        let tx = open(&mut slot)?;
        let done = bind(sql, params)
            .execute(&mut **tx)
            .await
            .map_err(|e| with_sql(e, sql))?;
        Ok(affected(done.rows_affected()))
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let mut slot = self.tx.lock().await;
        let tx = open(&mut slot)?;
        sqlx::Executor::execute(&mut **tx, sqlx::raw_sql(sql))
            .await
            .map_err(|e| with_sql(e, sql))?;
        Ok(())
    }

    async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
        let mut slot = self.tx.lock().await;
        let tx = open(&mut slot)?;
        let rows = bind(sql, params)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| with_sql(e, sql))?;
        rows.iter().map(decode_row).collect()
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let tx = self.tx.into_inner().ok_or_else(finished)?;
        tx.commit().await.map_err(|e| failed("COMMIT", e))
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        let tx = self.tx.into_inner().ok_or_else(finished)?;
        tx.rollback().await.map_err(|e| failed("ROLLBACK", e))
    }
}

fn finished() -> DbError {
    DbError::TransactionError("transaction already finished".to_string())
}

fn failed(statement: &str, err: sqlx::Error) -> DbError {
    match DbError::from(err) {
        DbError::ExecutionError(msg) => {
            DbError::TransactionError(format!("{statement} failed: {msg}"))
        }
        other => other,
    }
}

/// Attach the failing SQL to plain execution errors
fn with_sql(err: sqlx::Error, sql: &str) -> DbError {
    match DbError::from(err) {
        DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{msg}: {sql}")),
        other => other,
    }
}

fn affected(rows: u64) -> usize {
    usize::try_from(rows).unwrap_or(usize::MAX)
}

/// Hide the password of a connection URL in messages
pub fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}

fn bind<'q>(sql: &'q str, params: &[SqlValue]) -> Query<'q, Postgres, PgArguments> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, value| match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::BigInt(i) => query.bind(*i),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Timestamp(ts) => query.bind(*ts),
        })
}

fn decode_row(row: &PgRow) -> DbResult<Row> {
    row.columns()
        .iter()
        .map(|column| decode_cell(row, column.ordinal(), column.type_info().name()))
        .collect::<DbResult<Vec<_>>>()
        .map(Row)
}

/// Map one cell onto `SqlValue` by its PostgreSQL type name
fn decode_cell(row: &PgRow, index: usize, type_name: &str) -> DbResult<SqlValue> {
    let decoded = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(index).map(SqlValue::from),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| SqlValue::from(v.map(i64::from))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map(|v| SqlValue::from(v.map(i64::from))),
        "INT8" => row.try_get::<Option<i64>, _>(index).map(SqlValue::from),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .map(|v| v.map_or(SqlValue::Null, SqlValue::Timestamp)),
        _ => row.try_get::<Option<String>, _>(index).map(SqlValue::from),
    };
    decoded.map_err(|e| DbError::RowDecode {
        column: index,
        expected: "a supported PostgreSQL type",
        found: format!("{type_name}: {e}"),
    })
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
