//! Database trait definitions

use crate::error::DbResult;
use crate::value::{Row, SqlValue};
use async_trait::async_trait;
use ordo_core::DbType;

/// Database abstraction trait for Ordo
///
/// Implementations must be Send + Sync for async operation. Each call is a
/// self-contained unit of work; use [`begin`](Database::begin) to group
/// statements atomically.
#[async_trait]
pub trait Database: Send + Sync {
    /// Database type, used to pick a query provider
    fn db_type(&self) -> DbType;

    /// Execute one parameterized statement, returns affected rows
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a parameterized query and collect every row
    async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>>;

    /// Open a transaction on a dedicated connection
    async fn begin(&self) -> DbResult<Box<dyn Transaction>>;
}

/// An open transaction.
///
/// Dropping it without [`commit`](Transaction::commit) rolls back.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
