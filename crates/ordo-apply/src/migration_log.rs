//! Persisted history of applied migrations

use crate::error::{ApplyError, ApplyResult};
use chrono::{DateTime, Utc};
use ordo_core::{Migration, RunModifier};
use ordo_db::query::{QueryProvider, TableRef, LOG_COLUMNS, LOG_TABLE};
use ordo_db::{Database, Row, SqlValue};
use std::collections::HashMap;

/// One row of the migration log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationLogEntry {
    pub name: String,
    pub filename: String,
    pub author: String,
    pub run_modifier: RunModifier,
    pub run_order: i64,
    pub hash: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub user_params: Option<String>,
    /// Seen during the current cycle; in memory only
    pub applied: bool,
}

impl MigrationLogEntry {
    fn from_row(row: &Row) -> ApplyResult<Self> {
        let name = row.get_str(0)?.to_string();
        let decode = |message: String| ApplyError::LogDecode {
            name: name.clone(),
            message,
        };
        if row.len() != LOG_COLUMNS.len() {
            return Err(decode(format!(
                "expected {} columns, found {}",
                LOG_COLUMNS.len(),
                row.len()
            )));
        }
        let run_modifier = row
            .get_str(3)?
            .parse::<RunModifier>()
            .map_err(|e| decode(e.to_string()))?;

        Ok(Self {
            filename: row.get_str(1)?.to_string(),
            author: row.get_str(2)?.to_string(),
            run_modifier,
            run_order: row.get_i64(4)?,
            hash: row.get_str(5)?.to_string(),
            created_at: row.get_timestamp(6)?,
            last_executed_at: row.get_timestamp(7)?,
            user_params: row.get_opt_str(8)?.map(String::from),
            applied: false,
            name,
        })
    }

    /// Entry describing `migration` as just executed at `run_order`
    fn for_migration(migration: &Migration, run_order: i64, user_params: String) -> Self {
        Self {
            name: migration.name().to_string(),
            filename: migration.filename(),
            author: migration.author().to_string(),
            run_modifier: migration.run_modifier(),
            run_order,
            hash: migration.hash().to_string(),
            created_at: None,
            last_executed_at: None,
            user_params: Some(user_params),
            applied: true,
        }
    }
}

/// In-memory view of the migration log for one cycle, keyed by name
#[derive(Debug, Clone, Default)]
pub struct MigrationLog {
    entries: HashMap<String, MigrationLogEntry>,
}

impl MigrationLog {
    pub fn new(entries: impl IntoIterator<Item = MigrationLogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MigrationLogEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logged names ordered by persisted run order
    pub fn names_by_run_order(&self) -> Vec<String> {
        let mut entries: Vec<&MigrationLogEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.run_order.cmp(&b.run_order).then(a.name.cmp(&b.name)));
        entries.into_iter().map(|e| e.name.clone()).collect()
    }

    /// Move an entry to a new run order in memory
    pub fn set_run_order(&mut self, name: &str, run_order: i64) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.run_order = run_order;
        }
    }

    /// Mark an existing entry as seen in this cycle
    pub fn mark_applied(&mut self, name: &str) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.applied = true;
                true
            }
            None => false,
        }
    }

    /// Record a freshly written entry
    pub fn upsert(&mut self, entry: MigrationLogEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Names of entries never marked during this cycle, sorted
    pub fn unapplied(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .values()
            .filter(|e| !e.applied)
            .map(|e| e.name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Reads and writes the migration log table
pub struct MigrationLogStore<'a> {
    db: &'a dyn Database,
    provider: &'a dyn QueryProvider,
    schema: &'a str,
}

impl<'a> MigrationLogStore<'a> {
    pub fn new(db: &'a dyn Database, provider: &'a dyn QueryProvider, schema: &'a str) -> Self {
        Self {
            db,
            provider,
            schema,
        }
    }

    /// Fetch every log row
    pub async fn load(&self) -> ApplyResult<MigrationLog> {
        let rows = self
            .db
            .query_rows(&self.provider.select_log(self.schema), &[])
            .await?;
        let entries = rows
            .iter()
            .map(MigrationLogEntry::from_row)
            .collect::<ApplyResult<Vec<_>>>()?;
        log::debug!(
            "Loaded {} entries from {}",
            entries.len(),
            TableRef::new(self.schema, LOG_TABLE)
        );
        Ok(MigrationLog::new(entries))
    }

    /// Insert the entry for a migration executed for the first time
    pub async fn insert(&self, migration: &Migration, run_order: i64) -> ApplyResult<MigrationLogEntry> {
        let user_params = migration.user_params_json()?;
        log::debug!("Adding migration log entry for {}", migration.name());
        let params = [
            SqlValue::from(migration.name().as_str()),
            SqlValue::from(migration.filename()),
            SqlValue::from(migration.author()),
            SqlValue::from(migration.run_modifier().as_str()),
            SqlValue::from(run_order),
            SqlValue::from(migration.hash()),
            SqlValue::from(user_params.as_str()),
        ];
        self.db
            .execute(&self.provider.insert_log(self.schema), &params)
            .await?;
        Ok(MigrationLogEntry::for_migration(migration, run_order, user_params))
    }

    /// Update the entry of a re-executed migration
    pub async fn update(&self, migration: &Migration, run_order: i64) -> ApplyResult<MigrationLogEntry> {
        let user_params = migration.user_params_json()?;
        log::debug!("Updating migration log entry for {}", migration.name());
        let params = [
            SqlValue::from(migration.filename()),
            SqlValue::from(migration.author()),
            SqlValue::from(migration.run_modifier().as_str()),
            SqlValue::from(run_order),
            SqlValue::from(migration.hash()),
            SqlValue::from(user_params.as_str()),
            SqlValue::from(migration.name().as_str()),
        ];
        self.db
            .execute(&self.provider.update_log(self.schema), &params)
            .await?;
        Ok(MigrationLogEntry::for_migration(migration, run_order, user_params))
    }

    /// Rewrite persisted run orders in one transaction.
    ///
    /// Used once per cycle, after the order check passed, to close the gaps
    /// left by migrations inserted between applied ones.
    pub async fn renumber(&self, moves: &[(String, i64)]) -> ApplyResult<()> {
        if moves.is_empty() {
            return Ok(());
        }
        let sql = self.provider.update_run_order(self.schema);
        let tx = self.db.begin().await?;
        for (name, run_order) in moves {
            log::debug!("Moving migration log entry {name} to run order {run_order}");
            tx.execute(&sql, &[SqlValue::from(*run_order), SqlValue::from(name.as_str())])
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "migration_log_test.rs"]
mod tests;
