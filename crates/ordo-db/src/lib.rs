//! ordo-db - Database abstraction layer for Ordo
//!
//! This crate provides the `Database`/`Transaction` traits, DuckDB and
//! PostgreSQL implementations, and the per-database SQL for Ordo's control
//! tables.

pub mod duckdb;
pub mod error;
pub mod postgres;
pub mod query;
pub mod traits;
pub mod value;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use postgres::PostgresBackend;
pub use query::{query_provider_for, validate_provider, QueryProvider, TableRef};
pub use traits::{Database, Transaction};
pub use value::{Row, SqlValue};

use ordo_core::{DatabaseConfig, DbType};
use std::sync::Arc;

/// Open the database described by `config`.
///
/// For PostgreSQL, `path` holds the connection URL.
pub async fn connect(config: &DatabaseConfig) -> DbResult<Arc<dyn Database>> {
    match config.db_type {
        DbType::DuckDb => {
            log::debug!("Opening DuckDB database at {}", config.path);
            Ok(Arc::new(DuckDbBackend::new(&config.path)?))
        }
        DbType::Postgres => {
            log::debug!("Connecting to PostgreSQL at {}", postgres::redact(&config.path));
            Ok(Arc::new(PostgresBackend::connect(&config.path).await?))
        }
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
