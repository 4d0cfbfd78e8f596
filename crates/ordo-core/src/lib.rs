//! ordo-core - Core library for Ordo
//!
//! This crate provides the migration model, header parameters, changelog
//! parsing, configuration, and the ordering graph that turns a set of
//! migrations into one deterministic execution sequence.

pub mod changelog;
pub mod config;
pub mod error;
pub mod graph;
pub mod migration;
pub mod migration_name;
pub mod params;

pub use changelog::load_migrations;
pub use config::{
    Config, DatabaseConfig, DbType, LockConfig, ResolvedConfig, LOCK_WAIT_COUNTER_THRESHOLD,
    LOCK_WAIT_TIME_MS,
};
pub use error::{CoreError, CoreResult};
pub use graph::{Cluster, MigrationGraph};
pub use migration::{Migration, MigrationBuilder};
pub use migration_name::MigrationName;
pub use params::{MigrationParameter, MigrationParams, ParameterValue, RunModifier};
