//! Error types for ordo-apply

use ordo_core::CoreError;
use ordo_db::DbError;
use std::time::Duration;
use thiserror::Error;

/// Errors that terminate an apply cycle
#[derive(Error, Debug)]
pub enum ApplyError {
    /// A001: Exactly one of the two control tables exists
    #[error("[A001] Illegal database state: control table {missing} is missing")]
    SchemaInconsistency { missing: String },

    /// A002: Lock held by another run for the whole retry budget
    #[error("[A002] Could not acquire the migration lock after {attempts} attempts ({waited:?})")]
    LockTimeout { attempts: u32, waited: Duration },

    /// A003: Lock table exists but holds no row
    #[error("[A003] Lock table {table} has no lock row")]
    LockRowMissing { table: String },

    /// A004: Previously applied migrations would run in a different order
    #[error(
        "[A004] Migration order has changed since the last run: logged [{}], current [{}]. \
         Review migrations with runAfter/runBefore parameters",
        .expected.join(", "),
        .actual.join(", ")
    )]
    OrderDrift {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// A005: Logged migrations no longer present in the changelog
    #[error("[A005] Applied migrations are missing from the changelog: {}", .names.join(", "))]
    DeletedMigrations { names: Vec<String> },

    /// A006: ignore=true on a migration that was already applied
    #[error("[A006] Migration '{name}' is marked ignore:true but has already been applied")]
    IgnoreConflict { name: String },

    /// A007: run:once migration body changed after it was applied
    #[error("[A007] Migration '{name}' changed after it was applied; use run:onchange or run:always to re-apply it")]
    IllegalChange { name: String },

    /// A008: Sieve reached before order validation assigned a run status
    #[error("[A008] Run status of migration '{name}' was not computed")]
    RunStatusUnassigned { name: String },

    /// A009: A statement failed in a fail-fast migration
    #[error("[A009] Migration '{migration}' failed on statement `{statement}`: {source}")]
    StatementExecution {
        migration: String,
        statement: String,
        source: DbError,
    },

    /// A010: Migration log row cannot be decoded
    #[error("[A010] Cannot read migration log entry '{name}': {message}")]
    LogDecode { name: String, message: String },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for ApplyError
pub type ApplyResult<T> = Result<T, ApplyError>;
