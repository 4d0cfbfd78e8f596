//! Migration definitions

use crate::error::{CoreError, CoreResult};
use crate::migration_name::MigrationName;
use crate::params::{MigrationParams, ParameterValue, RunModifier};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One executable unit of schema change.
///
/// Immutable once built. Per-cycle state (run status, actual order) lives in
/// the apply engine's plan records, never here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    name: MigrationName,
    author: String,
    path: PathBuf,
    natural_order: u64,
    body: String,
    hash: String,
    params: MigrationParams,
    user_params: BTreeMap<String, String>,
}

impl Migration {
    /// Start building a migration from its header `author:title`
    pub fn builder(author: impl Into<String>, title: impl Into<String>) -> MigrationBuilder {
        MigrationBuilder {
            author: author.into(),
            title: title.into(),
            path: PathBuf::new(),
            natural_order: 0,
            body: String::new(),
            params: MigrationParams::default(),
            user_params: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &MigrationName {
        &self.name
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Source file the migration was parsed from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component of [`path`](Self::path), as stored in the migration log
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Discovery position; tie-break and fallback ordering key
    pub fn natural_order(&self) -> u64 {
        self.natural_order
    }

    /// Normalized body (trailing whitespace stripped, ends with `;`)
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Hex SHA-256 of the normalized body
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Body split on `;` with blank pieces dropped
    pub fn statements(&self) -> Vec<&str> {
        self.body
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn params(&self) -> &MigrationParams {
        &self.params
    }

    pub fn run_modifier(&self) -> RunModifier {
        self.params.run
    }

    pub fn is_ignored(&self) -> bool {
        self.params.ignore
    }

    pub fn is_transactional(&self) -> bool {
        self.params.transactional
    }

    pub fn fail_fast(&self) -> bool {
        self.params.fail_fast
    }

    /// Environment filter, if any
    pub fn environment(&self) -> Option<&str> {
        self.params.environment.as_deref()
    }

    /// Migrations that must run before this one (`runAfter`)
    pub fn explicit_previous_names(&self) -> &[MigrationName] {
        &self.params.run_after
    }

    /// Migrations that must run after this one (`runBefore`)
    pub fn explicit_next_names(&self) -> &[MigrationName] {
        &self.params.run_before
    }

    /// Free-form `#key:value` header parameters
    pub fn user_params(&self) -> &BTreeMap<String, String> {
        &self.user_params
    }

    /// User parameters as a JSON object with sorted keys
    pub fn user_params_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(&self.user_params)?)
    }
}

/// Builder for [`Migration`]; validation happens in [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct MigrationBuilder {
    author: String,
    title: String,
    path: PathBuf,
    natural_order: u64,
    body: String,
    params: MigrationParams,
    user_params: BTreeMap<String, String>,
}

impl MigrationBuilder {
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn natural_order(mut self, order: u64) -> Self {
        self.natural_order = order;
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set one behavioral parameter
    pub fn param(mut self, value: ParameterValue) -> Self {
        self.params.set(value);
        self
    }

    /// Replace all behavioral parameters
    pub fn params(mut self, params: MigrationParams) -> Self {
        self.params = params;
        self
    }

    pub fn user_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_params.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> CoreResult<Migration> {
        let invalid = |reason: &str| CoreError::InvalidMigration {
            name: self.title.clone(),
            reason: reason.to_string(),
        };

        let name = MigrationName::try_new(self.title.trim())
            .ok_or_else(|| invalid("title must be a non-empty name without spaces, ':' or ','"))?;
        if self.author.trim().is_empty() {
            return Err(invalid("author is empty"));
        }
        let body = normalize_body(&self.body);
        if body.trim_end_matches(';').trim().is_empty() {
            return Err(invalid("body is empty"));
        }
        if !self.params.run_after.is_empty() && !self.params.run_before.is_empty() {
            return Err(CoreError::ConflictingOrderConstraints {
                name: name.into_inner(),
            });
        }

        let hash = compute_hash(&body);
        Ok(Migration {
            name,
            author: self.author.trim().to_string(),
            path: self.path,
            natural_order: self.natural_order,
            body,
            hash,
            params: self.params,
            user_params: self.user_params,
        })
    }
}

fn normalize_body(raw: &str) -> String {
    let mut body = raw.trim_end().to_string();
    if !body.ends_with(';') {
        body.push(';');
    }
    body
}

fn compute_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
