//! DuckDB control-table queries

use super::{QueryProvider, TableRef, LOCK_TABLE, LOG_COLUMNS, LOG_TABLE};
use ordo_core::DbType;

/// `?` placeholders; `user_params` is stored as VARCHAR holding JSON text
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbQueryProvider;

impl QueryProvider for DuckDbQueryProvider {
    fn db_type(&self) -> DbType {
        DbType::DuckDb
    }

    fn table_exists(&self) -> String {
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = ? AND table_name = ?) AS is_present"
            .to_string()
    }

    fn create_control_tables(&self, schema: &str) -> String {
        let log = TableRef::new(schema, LOG_TABLE);
        let lock = TableRef::new(schema, LOCK_TABLE);
        format!(
            "CREATE SCHEMA IF NOT EXISTS {schema};
CREATE TABLE IF NOT EXISTS {log} (
    name VARCHAR PRIMARY KEY,
    filename VARCHAR NOT NULL,
    author VARCHAR NOT NULL,
    run_modifier VARCHAR NOT NULL,
    run_order BIGINT NOT NULL,
    hash VARCHAR NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    last_executed_at TIMESTAMPTZ NOT NULL,
    user_params VARCHAR
);
CREATE TABLE IF NOT EXISTS {lock} (
    locked BOOLEAN NOT NULL DEFAULT false
);
INSERT INTO {lock} (locked) SELECT false WHERE NOT EXISTS (SELECT 1 FROM {lock});",
            schema = super::quote_ident(schema),
        )
    }

    fn is_locked(&self, schema: &str) -> String {
        format!("SELECT locked FROM {} LIMIT 1", TableRef::new(schema, LOCK_TABLE))
    }

    fn acquire_lock(&self, schema: &str) -> String {
        format!(
            "UPDATE {} SET locked = true WHERE locked = false",
            TableRef::new(schema, LOCK_TABLE)
        )
    }

    fn release_lock(&self, schema: &str) -> String {
        format!("UPDATE {} SET locked = false", TableRef::new(schema, LOCK_TABLE))
    }

    fn select_log(&self, schema: &str) -> String {
        format!(
            "SELECT {} FROM {} ORDER BY run_order",
            LOG_COLUMNS.join(", "),
            TableRef::new(schema, LOG_TABLE)
        )
    }

    fn insert_log(&self, schema: &str) -> String {
        format!(
            "INSERT INTO {} (name, filename, author, run_modifier, run_order, hash, \
             created_at, last_executed_at, user_params) \
             VALUES (?, ?, ?, ?, ?, ?, now(), now(), ?)",
            TableRef::new(schema, LOG_TABLE)
        )
    }

    fn update_log(&self, schema: &str) -> String {
        format!(
            "UPDATE {} SET filename = ?, author = ?, run_modifier = ?, run_order = ?, \
             hash = ?, user_params = ?, last_executed_at = now() WHERE name = ?",
            TableRef::new(schema, LOG_TABLE)
        )
    }

    fn update_run_order(&self, schema: &str) -> String {
        format!(
            "UPDATE {} SET run_order = ? WHERE name = ?",
            TableRef::new(schema, LOG_TABLE)
        )
    }
}
