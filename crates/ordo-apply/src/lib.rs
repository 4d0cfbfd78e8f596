//! ordo-apply - Applies an ordered migration graph to a database
//!
//! A cycle creates the control tables if needed, takes the migration lock,
//! checks that previously applied migrations keep their order, runs each
//! migration through the sieve chain, executes the selected ones and keeps
//! the migration log in step.

pub mod engine;
pub mod error;
pub mod lock;
pub mod migration_log;
pub mod plan;
pub mod sieve;

pub use engine::{ApplyReport, FailedMigration, MigrationEngine};
pub use error::{ApplyError, ApplyResult};
pub use lock::LockManager;
pub use migration_log::{MigrationLog, MigrationLogEntry, MigrationLogStore};
pub use plan::{validate_order, Decision, PlanEntry, PlannedMigration, RunStatus};
pub use sieve::{EnvironmentSieve, IgnoreSieve, RunSieve, Sieve, SieveChain};
