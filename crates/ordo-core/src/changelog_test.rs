use super::*;
use crate::params::RunModifier;
use std::fs;
use tempfile::TempDir;

fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_parse_header_params() {
    let builder = parse_header(
        "--migration alice:create_users run:onchange failFast:false runAfter:a,b #ticket:OPS-1",
    )
    .unwrap();
    let m = builder.body("SELECT 1").build().unwrap();
    assert_eq!(m.name(), "create_users");
    assert_eq!(m.author(), "alice");
    assert_eq!(m.run_modifier(), RunModifier::OnChange);
    assert!(!m.fail_fast());
    assert_eq!(m.explicit_previous_names().len(), 2);
    assert_eq!(m.user_params().get("ticket").map(String::as_str), Some("OPS-1"));
}

#[test]
fn test_parse_header_rejects_unknown_and_malformed() {
    assert!(matches!(
        parse_header("--migration alice:t1 retries:3"),
        Err(CoreError::UnknownParameter { .. })
    ));
    assert!(matches!(
        parse_header("--migration alice:t1 always"),
        Err(CoreError::InvalidChangelogFormat { .. })
    ));
    assert!(parse_header("--migration t1").is_err());
}

#[test]
fn test_parse_migration_file_sections() {
    let content = "--ordo-migration-file\n\
--migration alice:t1\n\
CREATE TABLE a (id INT);\n\
\n\
--migration bob:t2 run:always\n\
INSERT INTO a VALUES (1);\n\
INSERT INTO a VALUES (2);\n";
    let mut order = 10;
    let migrations = parse_migration_file(Path::new("v1.sql"), content, &mut order).unwrap();

    assert_eq!(migrations.len(), 2);
    assert_eq!(order, 12);
    assert_eq!(migrations[0].natural_order(), 10);
    assert_eq!(migrations[0].body(), "CREATE TABLE a (id INT);");
    assert_eq!(migrations[1].author(), "bob");
    assert_eq!(migrations[1].statements().len(), 2);
}

#[test]
fn test_parse_migration_file_keeps_lookalike_comments_in_body() {
    let content = "--ordo-migration-file\n\
--migration alice:t1\n\
--migrations below create the audit schema\n\
CREATE TABLE a (id INT);\n";
    let mut order = 0;
    let migrations = parse_migration_file(Path::new("v1.sql"), content, &mut order).unwrap();

    assert_eq!(migrations.len(), 1);
    assert!(migrations[0]
        .body()
        .starts_with("--migrations below create the audit schema"));

    // bare keyword is still a header, and a malformed one
    let err = parse_migration_file(
        Path::new("v1.sql"),
        "--ordo-migration-file\n--migration alice:t1\nSELECT 1;\n--migration\n",
        &mut order,
    )
    .unwrap_err();
    assert!(err.to_string().contains("malformed migration header"));
}

#[test]
fn test_parse_migration_file_requires_header() {
    let mut order = 0;
    let err = parse_migration_file(
        Path::new("bad.sql"),
        "--migration alice:t1\nSELECT 1;",
        &mut order,
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidChangelogFormat { .. }));
}

#[test]
fn test_parse_migration_file_content_before_header() {
    let mut order = 0;
    let err = parse_migration_file(
        Path::new("bad.sql"),
        "--ordo-migration-file\nSELECT 0;\n--migration alice:t1\nSELECT 1;",
        &mut order,
    )
    .unwrap_err();
    assert!(err.to_string().contains("bad.sql"));
}

#[test]
fn test_load_migrations_discovery_order() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("changelog");
    write(
        &root,
        "a_core.ordo",
        "--ordo-changelog\n-- core tables\nv1/users.sql\n\nv1/orders.sql\n",
    );
    write(&root, "b_extra/extra.ordo", "--ordo-changelog\nextra.sql\n");
    write(&root, "notes.ordo", "just some notes\n");
    write(
        &root,
        "v1/users.sql",
        "--ordo-migration-file\n--migration alice:users\nCREATE TABLE users (id INT);\n",
    );
    write(
        &root,
        "v1/orders.sql",
        "--ordo-migration-file\n--migration alice:orders runAfter:users\nCREATE TABLE orders (id INT);\n",
    );
    write(
        &root,
        "b_extra/extra.sql",
        "--ordo-migration-file\n--migration bob:extra\nSELECT 1;\n",
    );

    let migrations = load_migrations(&[root]).unwrap();
    let names: Vec<(&str, u64)> = migrations
        .iter()
        .map(|m| (m.name().as_str(), m.natural_order()))
        .collect();
    assert_eq!(names, vec![("users", 0), ("orders", 1), ("extra", 2)]);
    assert_eq!(migrations[0].filename(), "users.sql");
}

#[test]
fn test_load_migrations_missing_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "main.ordo", "--ordo-changelog\nmissing.sql\n");
    let err = load_migrations(&[temp.path().to_path_buf()]).unwrap_err();
    assert!(matches!(err, CoreError::MigrationFileNotFound { ref path, .. } if path == "missing.sql"));
}

#[test]
fn test_load_migrations_missing_dir() {
    let temp = TempDir::new().unwrap();
    let err = load_migrations(&[temp.path().join("nope")]).unwrap_err();
    assert!(matches!(err, CoreError::ChangelogDirNotFound { .. }));
}
