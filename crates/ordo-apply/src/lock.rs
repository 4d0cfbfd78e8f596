//! Advisory lock over the single-row lock table

use crate::error::{ApplyError, ApplyResult};
use ordo_core::LockConfig;
use ordo_db::query::{QueryProvider, TableRef, LOCK_TABLE};
use ordo_db::Database;
use tokio::time::Instant;

/// Acquires and releases the migration lock with bounded retries
pub struct LockManager<'a> {
    db: &'a dyn Database,
    provider: &'a dyn QueryProvider,
    schema: &'a str,
    config: LockConfig,
}

impl<'a> LockManager<'a> {
    pub fn new(
        db: &'a dyn Database,
        provider: &'a dyn QueryProvider,
        schema: &'a str,
        config: LockConfig,
    ) -> Self {
        Self {
            db,
            provider,
            schema,
            config,
        }
    }

    /// One attempt: read the flag and set it if clear, in a single transaction.
    ///
    /// Losing a write-write race to another process counts as "held".
    pub async fn try_acquire(&self) -> ApplyResult<bool> {
        match self.try_acquire_once().await {
            Err(ApplyError::Db(e)) if e.is_conflict() => {
                log::debug!("Lock attempt lost a concurrent update: {e}");
                Ok(false)
            }
            other => other,
        }
    }

    async fn try_acquire_once(&self) -> ApplyResult<bool> {
        let tx = self.db.begin().await?;
        let rows = tx
            .query_rows(&self.provider.is_locked(self.schema), &[])
            .await?;
        let Some(row) = rows.first() else {
            tx.rollback().await?;
            return Err(ApplyError::LockRowMissing {
                table: TableRef::new(self.schema, LOCK_TABLE).to_string(),
            });
        };
        if row.get_bool(0)? {
            tx.rollback().await?;
            return Ok(false);
        }
        let updated = tx
            .execute(&self.provider.acquire_lock(self.schema), &[])
            .await?;
        tx.commit().await?;
        Ok(updated > 0)
    }

    /// Retry [`try_acquire`](Self::try_acquire) up to `max_attempts` times,
    /// sleeping `retry_interval` between attempts.
    pub async fn acquire(&self) -> ApplyResult<()> {
        let started = Instant::now();
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            if self.try_acquire().await? {
                log::info!("Acquired migration lock (attempt {attempt})");
                return Ok(());
            }
            log::debug!("Migration lock is held, attempt {attempt}/{attempts}");
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_interval()).await;
            }
        }

        Err(ApplyError::LockTimeout {
            attempts,
            waited: started.elapsed(),
        })
    }

    /// Clear the lock flag regardless of who set it
    pub async fn release(&self) -> ApplyResult<()> {
        self.db
            .execute(&self.provider.release_lock(self.schema), &[])
            .await?;
        log::info!("Released migration lock");
        Ok(())
    }

    /// Current value of the lock flag
    pub async fn is_locked(&self) -> ApplyResult<bool> {
        let rows = self
            .db
            .query_rows(&self.provider.is_locked(self.schema), &[])
            .await?;
        match rows.first() {
            Some(row) => Ok(row.get_bool(0)?),
            None => Err(ApplyError::LockRowMissing {
                table: TableRef::new(self.schema, LOCK_TABLE).to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
