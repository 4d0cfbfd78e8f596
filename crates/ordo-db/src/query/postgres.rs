//! PostgreSQL control-table queries

use super::{QueryProvider, TableRef, LOCK_TABLE, LOG_COLUMNS, LOG_TABLE};
use ordo_core::DbType;

/// `$n` placeholders; `user_params` is a JSON column
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresQueryProvider;

impl QueryProvider for PostgresQueryProvider {
    fn db_type(&self) -> DbType {
        DbType::Postgres
    }

    fn table_exists(&self) -> String {
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = $1 AND table_name = $2) AS is_present"
            .to_string()
    }

    fn create_control_tables(&self, schema: &str) -> String {
        let log = TableRef::new(schema, LOG_TABLE);
        let lock = TableRef::new(schema, LOCK_TABLE);
        format!(
            "CREATE SCHEMA IF NOT EXISTS {schema};
CREATE TABLE IF NOT EXISTS {log} (
    name TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    author TEXT NOT NULL,
    run_modifier TEXT NOT NULL,
    run_order BIGINT NOT NULL,
    hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    last_executed_at TIMESTAMPTZ NOT NULL,
    user_params JSON NULL
);
CREATE TABLE IF NOT EXISTS {lock} (
    locked BOOLEAN NOT NULL DEFAULT false
);
INSERT INTO {lock} (locked) SELECT false WHERE NOT EXISTS (SELECT 1 FROM {lock});",
            schema = super::quote_ident(schema),
        )
    }

    fn is_locked(&self, schema: &str) -> String {
        format!(
            "SELECT locked FROM {} LIMIT 1 FOR UPDATE",
            TableRef::new(schema, LOCK_TABLE)
        )
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
        // JSON comes back as text so both backends decode the same row shape
        let columns: Vec<String> = LOG_COLUMNS
            .iter()
            .map(|c| match *c {
                "user_params" => "user_params::text AS user_params".to_string(),
                other => other.to_string(),
            })
            .collect();
        format!(
            "SELECT {} FROM {} ORDER BY run_order",
            columns.join(", "),
            TableRef::new(schema, LOG_TABLE)
        )
    }

    fn insert_log(&self, schema: &str) -> String {
        format!(
            "INSERT INTO {} (name, filename, author, run_modifier, run_order, hash, \
             created_at, last_executed_at, user_params) \
             VALUES ($1, $2, $3, $4, $5, $6, now(), now(), $7::json)",
            TableRef::new(schema, LOG_TABLE)
        )
    }

    fn update_log(&self, schema: &str) -> String {
        format!(
            "UPDATE {} SET filename = $1, author = $2, run_modifier = $3, run_order = $4, \
             hash = $5, user_params = $6::json, last_executed_at = now() WHERE name = $7",
            TableRef::new(schema, LOG_TABLE)
        )
    }

    fn update_run_order(&self, schema: &str) -> String {
        format!(
            "UPDATE {} SET run_order = $1 WHERE name = $2",
            TableRef::new(schema, LOG_TABLE)
        )
    }
}
