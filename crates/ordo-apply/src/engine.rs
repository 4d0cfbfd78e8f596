//! One apply cycle: control tables, lock, order validation, sieving,
//! execution and log bookkeeping.

use crate::error::{ApplyError, ApplyResult};
use crate::lock::LockManager;
use crate::migration_log::{MigrationLog, MigrationLogStore};
use crate::plan::{validate_order, Decision, PlanEntry, PlannedMigration};
use crate::sieve::SieveChain;
use ordo_core::{LockConfig, Migration, MigrationGraph, ResolvedConfig};
use ordo_db::query::{query_provider_for, validate_provider, LOCK_TABLE, LOG_TABLE};
use ordo_db::{Database, DbError, QueryProvider, SqlValue, TableRef};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a successful apply cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Executed and logged, in execution order
    pub executed: Vec<String>,
    /// Rejected by the sieve chain
    pub skipped: Vec<String>,
    /// Failed without `failFast`; not logged
    pub failed: Vec<FailedMigration>,
}

impl ApplyReport {
    pub fn is_noop(&self) -> bool {
        self.executed.is_empty() && self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMigration {
    pub name: String,
    pub error: String,
}

/// Applies an ordered migration graph to one database
pub struct MigrationEngine {
    db: Arc<dyn Database>,
    provider: Box<dyn QueryProvider>,
    schema: String,
    environment: Option<String>,
    lock: LockConfig,
}

impl MigrationEngine {
    /// Engine using the built-in query provider for the database's kind
    pub fn new(db: Arc<dyn Database>, schema: impl Into<String>) -> ApplyResult<Self> {
        let provider = query_provider_for(db.db_type());
        Self::with_provider(db, provider, schema)
    }

    /// Engine with a custom query provider; its statements are checked
    /// against the parameters the engine binds.
    pub fn with_provider(
        db: Arc<dyn Database>,
        provider: Box<dyn QueryProvider>,
        schema: impl Into<String>,
    ) -> ApplyResult<Self> {
        let schema = schema.into();
        validate_provider(provider.as_ref(), &schema)?;
        Ok(Self {
            db,
            provider,
            schema,
            environment: None,
            lock: LockConfig::default(),
        })
    }

    /// Engine configured from a resolved project configuration
    pub fn from_config(db: Arc<dyn Database>, config: &ResolvedConfig) -> ApplyResult<Self> {
        Ok(Self::new(db, config.database.schema.clone())?
            .with_environment(config.environment.clone())
            .with_lock_config(config.lock))
    }

    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_lock_config(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    fn lock_manager(&self) -> LockManager<'_> {
        LockManager::new(
            self.db.as_ref(),
            self.provider.as_ref(),
            &self.schema,
            self.lock,
        )
    }

    fn log_store(&self) -> MigrationLogStore<'_> {
        MigrationLogStore::new(self.db.as_ref(), self.provider.as_ref(), &self.schema)
    }

    /// Run one full cycle.
    ///
    /// The lock is released whether the cycle succeeds or not; a release
    /// failure is only reported when nothing else went wrong.
    pub async fn apply(&self, graph: &MigrationGraph) -> ApplyResult<ApplyReport> {
        log::debug!("Applying {} migrations to schema {}", graph.len(), self.schema);
        if !self.control_tables_present().await? {
            log::info!("Creating control tables in schema {}", self.schema);
            self.db
                .execute_batch(&self.provider.create_control_tables(&self.schema))
                .await?;
        }

        let lock = self.lock_manager();
        lock.acquire().await?;

        let result = self.apply_locked(graph).await;
        let released = lock.release().await;

        match (result, released) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                log::error!("Failed to release migration lock: {release_err}");
                Err(e)
            }
        }
    }

    async fn apply_locked(&self, graph: &MigrationGraph) -> ApplyResult<ApplyReport> {
        let store = self.log_store();
        let mut history = store.load().await?;
        let ordered = graph.ordered_migrations();
        let planned = validate_order(&ordered, &history)?;
        self.renumber_logged(&store, &mut history, &planned).await?;
        let sieve = SieveChain::new(self.environment.clone());
        let mut report = ApplyReport::default();

        for migration in &planned {
            let name = migration.name().to_string();
            log::info!("Processing migration {name}");

            if !sieve.sift(migration)? {
                log::debug!("Skipping migration {name}");
                report.skipped.push(name.clone());
                history.mark_applied(&name);
                continue;
            }

            match self.execute(migration.migration).await {
                Ok(()) => {
                    let entry = if migration.logged {
                        store.update(migration.migration, migration.actual_order).await?
                    } else {
                        store.insert(migration.migration, migration.actual_order).await?
                    };
                    history.upsert(entry);
                    report.executed.push(name.clone());
                }
                Err(e) if migration.migration.fail_fast() => return Err(e),
                Err(e) => {
                    log::warn!("Migration {name} failed, continuing: {e}");
                    report.failed.push(FailedMigration {
                        name: name.clone(),
                        error: e.to_string(),
                    });
                }
            }
            history.mark_applied(&name);
        }

        let unapplied = history.unapplied();
        if !unapplied.is_empty() {
            return Err(ApplyError::DeletedMigrations { names: unapplied });
        }

        log::info!(
            "Apply finished: {} executed, {} skipped, {} failed",
            report.executed.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Bring every logged run order in line with the current position before
    /// anything executes, so an aborted cycle never leaves ties behind.
    ///
    /// `validate_order` has already proven the relative order of logged
    /// entries is unchanged.
    async fn renumber_logged(
        &self,
        store: &MigrationLogStore<'_>,
        history: &mut MigrationLog,
        planned: &[PlannedMigration<'_>],
    ) -> ApplyResult<()> {
        let moves: Vec<(String, i64)> = planned
            .iter()
            .filter_map(|m| {
                let entry = history.get(m.name())?;
                (entry.run_order != m.actual_order)
                    .then(|| (m.name().to_string(), m.actual_order))
            })
            .collect();
        if moves.is_empty() {
            return Ok(());
        }
        log::info!("Renumbering {} migration log entries", moves.len());
        store.renumber(&moves).await?;
        for (name, run_order) in &moves {
            history.set_run_order(name, *run_order);
        }
        Ok(())
    }

    /// Execute a migration's statements; one transaction when transactional
    async fn execute(&self, migration: &Migration) -> ApplyResult<()> {
        let statements = migration.statements();
        log::debug!(
            "Applying migration {} ({} statements, transactional: {})",
            migration.name(),
            statements.len(),
            migration.is_transactional()
        );
        let failed = |statement: &str, source: DbError| ApplyError::StatementExecution {
            migration: migration.name().to_string(),
            statement: statement.to_string(),
            source,
        };

        if migration.is_transactional() {
            let tx = self.db.begin().await?;
            for statement in &statements {
                tx.execute_batch(statement)
                    .await
                    .map_err(|e| failed(statement, e))?;
            }
            tx.commit().await?;
        } else {
            for statement in &statements {
                self.db
                    .execute_batch(statement)
                    .await
                    .map_err(|e| failed(statement, e))?;
            }
        }
        Ok(())
    }

    /// Dry run: what a cycle would do right now. Takes no lock and writes
    /// nothing.
    pub async fn plan(&self, graph: &MigrationGraph) -> ApplyResult<Vec<PlanEntry>> {
        let history = if self.control_tables_present().await? {
            self.log_store().load().await?
        } else {
            MigrationLog::default()
        };
        let ordered = graph.ordered_migrations();
        let planned = validate_order(&ordered, &history)?;
        let sieve = SieveChain::new(self.environment.clone());

        planned
            .iter()
            .map(|p| {
                let decision = if sieve.sift(p)? {
                    Decision::Execute
                } else {
                    Decision::Skip
                };
                let run_status = p.run_status.ok_or_else(|| ApplyError::RunStatusUnassigned {
                    name: p.name().to_string(),
                })?;
                Ok(PlanEntry {
                    name: p.name().to_string(),
                    author: p.migration.author().to_string(),
                    actual_order: p.actual_order,
                    run_status,
                    decision,
                })
            })
            .collect()
    }

    /// Clear a lock left behind by a crashed run
    pub async fn unlock(&self) -> ApplyResult<bool> {
        if !self.control_tables_present().await? {
            log::info!("No control tables in schema {}, nothing to unlock", self.schema);
            return Ok(false);
        }
        let lock = self.lock_manager();
        let was_locked = lock.is_locked().await?;
        lock.release().await?;
        Ok(was_locked)
    }

    /// `true` when both control tables exist, `false` when neither does
    async fn control_tables_present(&self) -> ApplyResult<bool> {
        let log_exists = self.table_exists(LOG_TABLE).await?;
        let lock_exists = self.table_exists(LOCK_TABLE).await?;
        match (log_exists, lock_exists) {
            (true, true) => Ok(true),
            (false, false) => Ok(false),
            (true, false) => Err(ApplyError::SchemaInconsistency {
                missing: TableRef::new(&self.schema, LOCK_TABLE).to_string(),
            }),
            (false, true) => Err(ApplyError::SchemaInconsistency {
                missing: TableRef::new(&self.schema, LOG_TABLE).to_string(),
            }),
        }
    }

    async fn table_exists(&self, table: &str) -> ApplyResult<bool> {
        let rows = self
            .db
            .query_rows(
                &self.provider.table_exists(),
                &[SqlValue::from(self.schema.as_str()), SqlValue::from(table)],
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(row.get_bool(0)?),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
