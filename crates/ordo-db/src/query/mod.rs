//! Control-table SQL, one provider per database kind.
//!
//! The apply engine never writes SQL itself; it asks a [`QueryProvider`] for
//! the statement and binds parameters positionally.

mod duckdb;
mod postgres;

pub use self::duckdb::DuckDbQueryProvider;
pub use self::postgres::PostgresQueryProvider;

use crate::error::{DbError, DbResult};
use ordo_core::DbType;
use std::fmt;

/// Name of the migration log table
pub const LOG_TABLE: &str = "migration_log";

/// Name of the single-row lock table
pub const LOCK_TABLE: &str = "migration_log_lock";

/// Column order of [`QueryProvider::select_log`] results
pub const LOG_COLUMNS: [&str; 9] = [
    "name",
    "filename",
    "author",
    "run_modifier",
    "run_order",
    "hash",
    "created_at",
    "last_executed_at",
    "user_params",
];

/// Bound parameters of [`QueryProvider::table_exists`]: schema, table
pub const TABLE_EXISTS_PARAMS: usize = 2;

/// Bound parameters of [`QueryProvider::insert_log`]:
/// name, filename, author, run_modifier, run_order, hash, user_params
pub const INSERT_LOG_PARAMS: usize = 7;

/// Bound parameters of [`QueryProvider::update_log`]:
/// filename, author, run_modifier, run_order, hash, user_params, name
pub const UPDATE_LOG_PARAMS: usize = 7;

/// Bound parameters of [`QueryProvider::update_run_order`]: run_order, name
pub const UPDATE_RUN_ORDER_PARAMS: usize = 2;

/// Schema-qualified table reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef<'a> {
    pub schema: &'a str,
    pub name: &'a str,
}

impl<'a> TableRef<'a> {
    pub fn new(schema: &'a str, name: &'a str) -> Self {
        Self { schema, name }
    }
}

impl fmt::Display for TableRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", quote_ident(self.schema), quote_ident(self.name))
    }
}

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// SQL for the control tables of one database kind
pub trait QueryProvider: Send + Sync {
    fn db_type(&self) -> DbType;

    /// One boolean column; bound parameters: schema, table
    fn table_exists(&self) -> String;

    /// Create schema, log table, lock table and the lock row (if absent)
    fn create_control_tables(&self, schema: &str) -> String;

    /// One boolean column per lock row
    fn is_locked(&self, schema: &str) -> String;

    /// Set the flag when clear; affects one row on success
    fn acquire_lock(&self, schema: &str) -> String;

    /// Clear the flag unconditionally
    fn release_lock(&self, schema: &str) -> String;

    /// Every log row in [`LOG_COLUMNS`] order
    fn select_log(&self, schema: &str) -> String;

    /// See [`INSERT_LOG_PARAMS`]
    fn insert_log(&self, schema: &str) -> String;

    /// See [`UPDATE_LOG_PARAMS`]
    fn update_log(&self, schema: &str) -> String;

    /// See [`UPDATE_RUN_ORDER_PARAMS`]
    fn update_run_order(&self, schema: &str) -> String;
}

/// Provider matching a database kind
pub fn query_provider_for(db_type: DbType) -> Box<dyn QueryProvider> {
    match db_type {
        DbType::DuckDb => Box::new(DuckDbQueryProvider),
        DbType::Postgres => Box::new(PostgresQueryProvider),
    }
}

/// Check every parameterized statement of `provider` against the number of
/// parameters the engine binds to it.
pub fn validate_provider(provider: &dyn QueryProvider, schema: &str) -> DbResult<()> {
    let checks = [
        ("table_exists", provider.table_exists(), TABLE_EXISTS_PARAMS),
        ("is_locked", provider.is_locked(schema), 0),
        ("acquire_lock", provider.acquire_lock(schema), 0),
        ("release_lock", provider.release_lock(schema), 0),
        ("select_log", provider.select_log(schema), 0),
        ("insert_log", provider.insert_log(schema), INSERT_LOG_PARAMS),
        ("update_log", provider.update_log(schema), UPDATE_LOG_PARAMS),
        (
            "update_run_order",
            provider.update_run_order(schema),
            UPDATE_RUN_ORDER_PARAMS,
        ),
    ];
    for (query, sql, expected) in checks {
        let found = count_placeholders(&sql);
        if found != expected {
            return Err(DbError::InvalidQuery {
                query: query.to_string(),
                message: format!(
                    "{found} placeholders for {expected} bound parameters ({} provider)",
                    provider.db_type()
                ),
            });
        }
    }
    Ok(())
}

/// Count `?` and distinct `$n` placeholders outside quoted text
pub fn count_placeholders(sql: &str) -> usize {
    let mut anonymous = 0;
    let mut numbered = std::collections::BTreeSet::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '?' => anonymous += 1,
            '$' => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(*d);
                    chars.next();
                }
                if let Ok(n) = digits.parse::<u32>() {
                    numbered.insert(n);
                }
            }
            _ => {}
        }
    }
    anonymous + numbered.len()
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
