//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use ordo_apply::MigrationEngine;
use ordo_core::{load_migrations, Config, DbType, MigrationGraph, ResolvedConfig};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main.rs maps it to the process status
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Project configuration resolved against the global flags
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
    pub(crate) resolved: ResolvedConfig,
}

impl Project {
    /// Load the config, apply `--target` (or `ORDO_TARGET`) and `--env`
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);
        let config = match &global.config {
            Some(path) => {
                Config::load(Path::new(path)).context("Failed to load configuration file")?
            }
            None => Config::load_from_dir(&root).context("Failed to load project configuration")?,
        };

        let target = Config::resolve_target(global.target.as_deref());
        let mut resolved = config
            .resolve(target.as_deref())
            .context("Failed to resolve target")?;
        if let Some(env) = &global.env {
            resolved.environment = Some(env.clone());
        }
        if resolved.database.db_type == DbType::DuckDb {
            resolved.database.path = database_path(&root, &resolved.database.path);
        }

        log::debug!(
            "Project {} at {} (database {} at {}, environment {:?})",
            config.name,
            root.display(),
            resolved.database.db_type,
            ordo_db::postgres::redact(&resolved.database.path),
            resolved.environment
        );

        Ok(Self {
            root,
            config,
            resolved,
        })
    }

    /// Parse every changelog and order the migrations
    pub(crate) fn graph(&self) -> Result<MigrationGraph> {
        let paths = self.config.changelog_paths_absolute(&self.root);
        let migrations = load_migrations(&paths).context("Failed to load changelogs")?;
        MigrationGraph::build(migrations).context("Failed to order migrations")
    }

    /// Connect to the target database
    pub(crate) async fn engine(&self) -> Result<MigrationEngine> {
        let db = ordo_db::connect(&self.resolved.database)
            .await
            .context("Failed to connect to database")?;
        Ok(MigrationEngine::from_config(db, &self.resolved)?)
    }
}

/// File database paths are relative to the project directory
pub(crate) fn database_path(root: &Path, path: &str) -> String {
    if path == ":memory:" || Path::new(path).is_absolute() {
        return path.to_string();
    }
    root.join(path).display().to_string()
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
