//! Per-cycle migration state and order validation

use crate::error::{ApplyError, ApplyResult};
use crate::migration_log::{MigrationLog, MigrationLogEntry};
use ordo_core::Migration;
use serde::Serialize;
use std::fmt;

/// Relationship between a migration and its log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No log entry
    New,
    /// Logged with the same hash
    Applied,
    /// Logged with a different hash
    BodyChanged,
}

impl RunStatus {
    pub fn of(migration: &Migration, entry: Option<&MigrationLogEntry>) -> Self {
        match entry {
            None => RunStatus::New,
            Some(entry) if entry.hash == migration.hash() => RunStatus::Applied,
            Some(_) => RunStatus::BodyChanged,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::New => write!(f, "new"),
            RunStatus::Applied => write!(f, "applied"),
            RunStatus::BodyChanged => write!(f, "body_changed"),
        }
    }
}

/// A migration together with the state computed for the current cycle
#[derive(Debug, Clone)]
pub struct PlannedMigration<'a> {
    pub migration: &'a Migration,
    /// Position in this cycle's execution order
    pub actual_order: i64,
    /// Set during order validation
    pub run_status: Option<RunStatus>,
    /// Whether a log entry exists for this migration
    pub logged: bool,
}

impl<'a> PlannedMigration<'a> {
    /// Planned migration with no run status yet
    pub fn new(migration: &'a Migration, actual_order: i64) -> Self {
        Self {
            migration,
            actual_order,
            run_status: None,
            logged: false,
        }
    }

    pub fn name(&self) -> &str {
        self.migration.name().as_str()
    }
}

/// Assign actual orders and run statuses, then compare the logged migrations'
/// current order with their persisted run order.
pub fn validate_order<'a>(
    ordered: &[&'a Migration],
    log: &MigrationLog,
) -> ApplyResult<Vec<PlannedMigration<'a>>> {
    let planned: Vec<PlannedMigration<'a>> = ordered
        .iter()
        .zip(0i64..)
        .map(|(&migration, actual_order)| {
            let entry = log.get(migration.name().as_str());
            let status = RunStatus::of(migration, entry);
            log::debug!("Migration {} has run status {}", migration.name(), status);
            PlannedMigration {
                migration,
                actual_order,
                run_status: Some(status),
                logged: entry.is_some(),
            }
        })
        .collect();

    let current: Vec<String> = planned
        .iter()
        .filter(|p| p.logged)
        .map(|p| p.name().to_string())
        .collect();
    let persisted = log.names_by_run_order();

    if current.len() != persisted.len() {
        let names = persisted
            .into_iter()
            .filter(|name| !current.contains(name))
            .collect();
        return Err(ApplyError::DeletedMigrations { names });
    }
    if current != persisted {
        return Err(ApplyError::OrderDrift {
            expected: persisted,
            actual: current,
        });
    }
    Ok(planned)
}

/// Whether a migration would run in this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Execute,
    Skip,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Execute => write!(f, "execute"),
            Decision::Skip => write!(f, "skip"),
        }
    }
}

/// One line of a dry-run plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub name: String,
    pub author: String,
    pub actual_order: i64,
    pub run_status: RunStatus,
    pub decision: Decision,
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
