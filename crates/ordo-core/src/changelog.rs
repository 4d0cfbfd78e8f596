//! Changelog discovery and migration file parsing.
//!
//! A changelog is a `*.ordo` file whose first line is `--ordo-changelog`;
//! every other non-blank, non-comment line names a migration file relative to
//! the changelog's directory. Migration files start with
//! `--ordo-migration-file` and contain one or more sections, each introduced
//! by a header:
//!
//! ```text
//! --migration alice:create_users run:onchange runAfter:create_schema #ticket:OPS-1
//! CREATE TABLE users (id BIGINT);
//! ```

use crate::error::{CoreError, CoreResult};
use crate::migration::{Migration, MigrationBuilder};
use crate::params;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// First line of a changelog file
pub const CHANGELOG_HEADER: &str = "--ordo-changelog";

/// First line of a migration file
pub const MIGRATION_FILE_HEADER: &str = "--ordo-migration-file";

/// Extension of changelog files
pub const CHANGELOG_EXTENSION: &str = "ordo";

/// Keyword opening a migration section header
const MIGRATION_HEADER_KEYWORD: &str = "--migration";

/// Prefix marking a user-defined header parameter
const USER_PARAM_PREFIX: char = '#';

static HEADER_RE: OnceLock<Regex> = OnceLock::new();

fn header_re() -> &'static Regex {
    HEADER_RE.get_or_init(|| {
        Regex::new(r"^--migration\s+([^\s:]+):(\S+)(.*)$").expect("valid regex literal")
    })
}

/// Discover every changelog under `dirs` and parse the migrations they list.
///
/// Natural orders are assigned from one counter across all files, in
/// discovery order.
pub fn load_migrations(dirs: &[PathBuf]) -> CoreResult<Vec<Migration>> {
    let mut changelogs = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            return Err(CoreError::ChangelogDirNotFound {
                path: dir.display().to_string(),
            });
        }
        discover_changelogs_recursive(dir, &mut changelogs)?;
    }
    changelogs.sort();
    changelogs.dedup();

    let mut next_order = 0u64;
    let mut migrations = Vec::new();
    for changelog in &changelogs {
        let content = read(changelog)?;
        if !has_header(&content, CHANGELOG_HEADER) {
            log::debug!(
                "Skipping {}: missing {} header",
                changelog.display(),
                CHANGELOG_HEADER
            );
            continue;
        }
        for file in migration_paths(changelog, &content)? {
            let content = read(&file)?;
            migrations.extend(parse_migration_file(&file, &content, &mut next_order)?);
        }
    }

    log::debug!(
        "Loaded {} migrations from {} changelog files",
        migrations.len(),
        changelogs.len()
    );
    Ok(migrations)
}

fn discover_changelogs_recursive(dir: &Path, found: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })? {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            discover_changelogs_recursive(&path, found)?;
        } else if path.extension().is_some_and(|e| e == CHANGELOG_EXTENSION) {
            found.push(path);
        }
    }
    Ok(())
}

fn read(path: &Path) -> CoreResult<String> {
    std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })
}

fn has_header(content: &str, header: &str) -> bool {
    content
        .lines()
        .next()
        .is_some_and(|line| line.trim().to_lowercase() == header)
}

/// Migration file paths listed in a changelog, resolved against its directory
pub fn migration_paths(changelog: &Path, content: &str) -> CoreResult<Vec<PathBuf>> {
    let dir = changelog.parent().unwrap_or_else(|| Path::new("."));
    let mut paths = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("--") {
            continue;
        }
        let path = dir.join(line);
        if !path.is_file() {
            return Err(CoreError::MigrationFileNotFound {
                path: line.to_string(),
                changelog: changelog.display().to_string(),
            });
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Parse one migration file, numbering migrations from `next_order`
pub fn parse_migration_file(
    path: &Path,
    content: &str,
    next_order: &mut u64,
) -> CoreResult<Vec<Migration>> {
    let format_error = |message: String| CoreError::InvalidChangelogFormat {
        path: path.display().to_string(),
        message,
    };

    let mut lines = content.lines().skip_while(|l| l.trim().is_empty());
    match lines.next() {
        Some(first) if first.trim().to_lowercase() == MIGRATION_FILE_HEADER => {}
        _ => {
            return Err(format_error(format!(
                "migration file must start with {MIGRATION_FILE_HEADER}"
            )))
        }
    }

    let mut sections: Vec<(MigrationBuilder, Vec<&str>)> = Vec::new();
    for line in lines {
        if is_header_line(line) {
            let builder = parse_header(line.trim()).map_err(|e| match e {
                CoreError::InvalidChangelogFormat { message, .. } => format_error(message),
                other => other,
            })?;
            sections.push((builder, Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        } else if !line.trim().is_empty() {
            return Err(format_error(format!(
                "content before the first migration header: '{}'",
                line.trim()
            )));
        }
    }

    let mut migrations = Vec::with_capacity(sections.len());
    for (builder, body) in sections {
        let migration = builder
            .path(path)
            .natural_order(*next_order)
            .body(body.join("\n").trim())
            .build()?;
        *next_order += 1;
        migrations.push(migration);
    }

    log::debug!(
        "Parsed {} migrations from {}",
        migrations.len(),
        path.display()
    );
    Ok(migrations)
}

/// `--migration` on its own or followed by whitespace; `--migrations ...` is
/// a plain SQL comment
fn is_header_line(line: &str) -> bool {
    match line.trim().strip_prefix(MIGRATION_HEADER_KEYWORD) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// Parse a `--migration author:title [param:value ...]` header line
pub fn parse_header(line: &str) -> CoreResult<MigrationBuilder> {
    let caps = header_re()
        .captures(line)
        .ok_or_else(|| CoreError::InvalidChangelogFormat {
            path: String::new(),
            message: format!("malformed migration header '{line}'"),
        })?;

    let mut builder = Migration::builder(&caps[1], &caps[2]);
    for token in caps[3].split_whitespace() {
        let Some((key, value)) = token.split_once(':') else {
            return Err(CoreError::InvalidChangelogFormat {
                path: String::new(),
                message: format!("header parameter '{token}' is not key:value"),
            });
        };
        if let Some(user_key) = key.strip_prefix(USER_PARAM_PREFIX) {
            builder = builder.user_param(user_key, value);
        } else {
            builder = builder.param(params::parse(key, value)?);
        }
    }
    Ok(builder)
}

#[cfg(test)]
#[path = "changelog_test.rs"]
mod tests;
