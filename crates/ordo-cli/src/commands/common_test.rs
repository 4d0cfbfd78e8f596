use super::*;
use std::fs;
use tempfile::TempDir;

fn global(dir: &Path) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: dir.display().to_string(),
        config: None,
        target: None,
        env: None,
    }
}

const CONFIG: &str = r#"
name: shop
environment: dev
database:
  path: shop.duckdb
targets:
  prod:
    environment: prod
    database:
      path: /var/lib/shop/prod.duckdb
      schema: ops
  cloud:
    database:
      type: postgres
      path: postgres://ordo@db.internal/shop
"#;

#[test]
fn test_database_path() {
    let root = Path::new("/work/project");
    assert_eq!(database_path(root, ":memory:"), ":memory:");
    assert_eq!(database_path(root, "/abs/db.duckdb"), "/abs/db.duckdb");
    assert_eq!(
        database_path(root, "db/ordo.duckdb"),
        root.join("db/ordo.duckdb").display().to_string()
    );
}

#[test]
fn test_load_project_defaults() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("ordo.yml"), CONFIG).unwrap();

    let project = Project::load(&global(temp.path())).unwrap();
    assert_eq!(project.config.name, "shop");
    assert_eq!(project.resolved.environment.as_deref(), Some("dev"));
    assert!(project.resolved.database.path.ends_with("shop.duckdb"));
    assert!(Path::new(&project.resolved.database.path).is_absolute());
}

#[test]
fn test_load_project_target_and_env_override() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("ordo.yml"), CONFIG).unwrap();

    let mut args = global(temp.path());
    args.target = Some("prod".to_string());
    let project = Project::load(&args).unwrap();
    assert_eq!(project.resolved.database.schema, "ops");
    assert_eq!(project.resolved.environment.as_deref(), Some("prod"));

    args.env = Some("canary".to_string());
    let project = Project::load(&args).unwrap();
    assert_eq!(project.resolved.environment.as_deref(), Some("canary"));
}

#[test]
fn test_load_project_unknown_target() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("ordo.yml"), CONFIG).unwrap();

    let mut args = global(temp.path());
    args.target = Some("staging".to_string());
    let err = Project::load(&args).err().unwrap();
    assert!(format!("{err:#}").contains("prod"));
}

#[test]
fn test_load_project_missing_config() {
    let temp = TempDir::new().unwrap();
    assert!(Project::load(&global(temp.path())).is_err());
}

#[test]
fn test_postgres_url_is_not_a_project_path() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("ordo.yml"), CONFIG).unwrap();

    let mut args = global(temp.path());
    args.target = Some("cloud".to_string());
    let project = Project::load(&args).unwrap();
    assert_eq!(project.resolved.database.db_type, DbType::Postgres);
    assert_eq!(
        project.resolved.database.path,
        "postgres://ordo@db.internal/shop"
    );
}
