//! Error types for ordo-core

use thiserror::Error;

/// Core error type for Ordo
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Changelog directory not found
    #[error("[E004] Changelog directory not found: {path}")]
    ChangelogDirNotFound { path: String },

    /// E010: Changelog or migration file does not follow the expected layout
    #[error("[E010] Invalid changelog format in {path}: {message}")]
    InvalidChangelogFormat { path: String, message: String },

    /// E011: Migration file referenced by a changelog does not exist
    #[error("[E011] Migration file '{path}' listed in changelog {changelog} not found")]
    MigrationFileNotFound { path: String, changelog: String },

    /// E012: Unknown migration parameter in a header
    #[error("[E012] Unknown migration parameter '{name}'")]
    UnknownParameter { name: String },

    /// E013: Parameter value does not parse for its kind
    #[error("[E013] Invalid value '{value}' for parameter '{name}': expected {expected}")]
    InvalidParameterValue {
        name: String,
        value: String,
        expected: String,
    },

    /// E014: Migration is missing a required piece (title, author, body)
    #[error("[E014] Invalid migration '{name}': {reason}")]
    InvalidMigration { name: String, reason: String },

    /// E020: Ordering constraints close a cycle
    #[error("[E020] Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// E021: runAfter/runBefore names a migration that does not exist
    #[error("[E021] Migration '{migration}' declares {constraint}: '{target}', but no such migration exists")]
    UnknownReference {
        migration: String,
        constraint: String,
        target: String,
    },

    /// E022: Two migrations share the same name
    #[error("[E022] Duplicate migration name: {name}")]
    DuplicateMigration { name: String },

    /// E023: A migration declares both runAfter and runBefore
    #[error("[E023] Migration '{name}' declares both runAfter and runBefore; use only one ordering constraint per migration")]
    ConflictingOrderConstraints { name: String },

    /// E031: IO error with file path context
    #[error("[E031] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E032: JSON serialization error
    #[error("[E032] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
