//! Predicates deciding whether a migration executes in the current cycle

use crate::error::{ApplyError, ApplyResult};
use crate::plan::{PlannedMigration, RunStatus};
use ordo_core::RunModifier;

/// One predicate of the chain
pub trait Sieve: Send + Sync {
    /// Name used in debug logs
    fn name(&self) -> &'static str;

    /// `true` keeps the migration selected for execution
    fn sift(&self, planned: &PlannedMigration<'_>) -> ApplyResult<bool>;
}

/// Drops `ignore:true` migrations; ignoring an applied migration is an error
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreSieve;

impl Sieve for IgnoreSieve {
    fn name(&self) -> &'static str {
        "ignore"
    }

    fn sift(&self, planned: &PlannedMigration<'_>) -> ApplyResult<bool> {
        if !planned.migration.is_ignored() {
            return Ok(true);
        }
        if planned.logged {
            return Err(ApplyError::IgnoreConflict {
                name: planned.name().to_string(),
            });
        }
        Ok(false)
    }
}

/// Run status x run modifier matrix
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSieve;

impl Sieve for RunSieve {
    fn name(&self) -> &'static str {
        "run"
    }

    fn sift(&self, planned: &PlannedMigration<'_>) -> ApplyResult<bool> {
        let status = planned
            .run_status
            .ok_or_else(|| ApplyError::RunStatusUnassigned {
                name: planned.name().to_string(),
            })?;
        match (status, planned.migration.run_modifier()) {
            (RunStatus::New, _) => Ok(true),
            (_, RunModifier::Always) => Ok(true),
            (RunStatus::BodyChanged, RunModifier::OnChange) => Ok(true),
            (RunStatus::BodyChanged, RunModifier::Once) => Err(ApplyError::IllegalChange {
                name: planned.name().to_string(),
            }),
            (RunStatus::Applied, RunModifier::Once | RunModifier::OnChange) => Ok(false),
        }
    }
}

/// Keeps migrations whose `env` filter matches the engine's environment
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSieve {
    environment: Option<String>,
}

impl EnvironmentSieve {
    pub fn new(environment: Option<String>) -> Self {
        Self { environment }
    }
}

impl Sieve for EnvironmentSieve {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn sift(&self, planned: &PlannedMigration<'_>) -> ApplyResult<bool> {
        Ok(match planned.migration.environment() {
            None => true,
            Some(wanted) => self.environment.as_deref() == Some(wanted),
        })
    }
}

/// AND-composition of sieves, evaluated in order
pub struct SieveChain {
    sieves: Vec<Box<dyn Sieve>>,
}

impl SieveChain {
    /// The standard chain: ignore, run, environment
    pub fn new(environment: Option<String>) -> Self {
        Self {
            sieves: vec![
                Box::new(IgnoreSieve),
                Box::new(RunSieve),
                Box::new(EnvironmentSieve::new(environment)),
            ],
        }
    }

    /// Evaluate every sieve; the first error wins over any result
    pub fn sift(&self, planned: &PlannedMigration<'_>) -> ApplyResult<bool> {
        let mut selected = true;
        for sieve in &self.sieves {
            let keep = sieve.sift(planned)?;
            log::debug!("Sieve {} -> {} for {}", sieve.name(), keep, planned.name());
            selected &= keep;
        }
        Ok(selected)
    }
}

#[cfg(test)]
#[path = "sieve_test.rs"]
mod tests;
