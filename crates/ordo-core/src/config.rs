//! Configuration types and parsing for ordo.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when no `--target` flag is given
pub const TARGET_ENV_VAR: &str = "ORDO_TARGET";

/// Default number of lock acquisition attempts
pub const LOCK_WAIT_COUNTER_THRESHOLD: u32 = 15;

/// Default pause between lock acquisition attempts, in milliseconds
pub const LOCK_WAIT_TIME_MS: u64 = 1000;

/// Main project configuration from ordo.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Directories searched (recursively) for `*.ordo` changelog files
    #[serde(default = "default_changelog_paths")]
    pub changelog_paths: Vec<String>,

    /// Environment matched against each migration's `env` parameter
    #[serde(default)]
    pub environment: Option<String>,

    /// Target database
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Lock retry behavior
    #[serde(default)]
    pub lock: LockConfig,

    /// Named overrides selected with `--target`
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Environment override
    #[serde(default)]
    pub environment: Option<String>,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
    /// PostgreSQL
    Postgres,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Postgres => write!(f, "postgres"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type (duckdb or postgres)
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// DuckDB file or `:memory:`; a connection URL for PostgreSQL
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Schema holding the control tables
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
            schema: default_schema(),
        }
    }
}

/// Lock acquisition retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Sleep between attempts, in milliseconds
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl LockConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Effective settings after applying a target's overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub database: DatabaseConfig,
    pub environment: Option<String>,
    pub lock: LockConfig,
}

fn default_changelog_paths() -> Vec<String> {
    vec!["changelog".to_string()]
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

fn default_schema() -> String {
    "main".to_string()
}

fn is_postgres_url(path: &str) -> bool {
    path.starts_with("postgres://") || path.starts_with("postgresql://")
}

fn default_retry_interval_ms() -> u64 {
    LOCK_WAIT_TIME_MS
}

fn default_max_attempts() -> u32 {
    LOCK_WAIT_COUNTER_THRESHOLD
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for ordo.yml or ordo.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("ordo.yml");
        let yaml_path = dir.join("ordo.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.changelog_paths.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one changelog_paths entry must be specified".to_string(),
            });
        }

        if self.lock.max_attempts == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lock.max_attempts must be at least 1".to_string(),
            });
        }

        let target_dbs = self
            .targets
            .iter()
            .filter_map(|(name, t)| t.database.as_ref().map(|db| (Some(name.as_str()), db)));
        for (target, db) in std::iter::once((None, &self.database)).chain(target_dbs) {
            let prefix = match target {
                Some(name) => format!("targets.{name}.database"),
                None => "database".to_string(),
            };
            if db.schema.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{prefix}.schema cannot be empty"),
                });
            }
            if db.db_type == DbType::Postgres && !is_postgres_url(&db.path) {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "{prefix}.path must be a postgres:// connection URL for type postgres"
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get absolute changelog directories relative to a project root
    pub fn changelog_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.changelog_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Get the list of available target names, sorted
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Apply the overrides of `target`, if any.
    ///
    /// An unknown target name is an error listing the available targets.
    pub fn resolve(&self, target: Option<&str>) -> CoreResult<ResolvedConfig> {
        let Some(name) = target else {
            return Ok(ResolvedConfig {
                database: self.database.clone(),
                environment: self.environment.clone(),
                lock: self.lock,
            });
        };

        let target_config = self
            .targets
            .get(name)
            .ok_or_else(|| CoreError::ConfigInvalid {
                message: format!(
                    "Target '{}' not found. Available targets: {}",
                    name,
                    self.available_targets().join(", ")
                ),
            })?;

        Ok(ResolvedConfig {
            database: target_config
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone()),
            environment: target_config
                .environment
                .clone()
                .or_else(|| self.environment.clone()),
            lock: self.lock,
        })
    }

    /// Resolve target from CLI flag or ORDO_TARGET environment variable
    ///
    /// Priority: CLI flag > ORDO_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
