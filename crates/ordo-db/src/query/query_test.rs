use super::*;
use crate::duckdb::DuckDbBackend;
use crate::traits::Database;
use crate::value::SqlValue;

#[test]
fn test_count_placeholders() {
    assert_eq!(count_placeholders("SELECT 1"), 0);
    assert_eq!(count_placeholders("SELECT ? , ?"), 2);
    assert_eq!(count_placeholders("SELECT '?', \"a?\" , ?"), 1);
    assert_eq!(count_placeholders("SELECT $1, $2, $1::json"), 2);
    assert_eq!(count_placeholders("SELECT 'it''s ?' WHERE a = $3"), 1);
}

#[test]
fn test_table_ref_quoting() {
    assert_eq!(
        TableRef::new("main", LOG_TABLE).to_string(),
        "\"main\".\"migration_log\""
    );
    assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
}

#[test]
fn test_builtin_providers_validate() {
    for db_type in [DbType::DuckDb, DbType::Postgres] {
        let provider = query_provider_for(db_type);
        assert_eq!(provider.db_type(), db_type);
        validate_provider(provider.as_ref(), "main").unwrap();
    }
}

/// Update statement missing its `author` placeholder
struct BrokenUpdateProvider;

impl QueryProvider for BrokenUpdateProvider {
    fn db_type(&self) -> DbType {
        DbType::DuckDb
    }
    fn table_exists(&self) -> String {
        DuckDbQueryProvider.table_exists()
    }
    fn create_control_tables(&self, schema: &str) -> String {
        DuckDbQueryProvider.create_control_tables(schema)
    }
    fn is_locked(&self, schema: &str) -> String {
        DuckDbQueryProvider.is_locked(schema)
    }
    fn acquire_lock(&self, schema: &str) -> String {
        DuckDbQueryProvider.acquire_lock(schema)
    }
    fn release_lock(&self, schema: &str) -> String {
        DuckDbQueryProvider.release_lock(schema)
    }
    fn select_log(&self, schema: &str) -> String {
        DuckDbQueryProvider.select_log(schema)
    }
    fn insert_log(&self, schema: &str) -> String {
        DuckDbQueryProvider.insert_log(schema)
    }
    fn update_log(&self, schema: &str) -> String {
        format!(
            "UPDATE {} SET filename = ? run_modifier = ?, run_order = ?, hash = ?, \
             user_params = ?, last_executed_at = now() WHERE name = ?",
            TableRef::new(schema, LOG_TABLE)
        )
    }
    fn update_run_order(&self, schema: &str) -> String {
        DuckDbQueryProvider.update_run_order(schema)
    }
}

#[test]
fn test_broken_provider_rejected() {
    let err = validate_provider(&BrokenUpdateProvider, "main").unwrap_err();
    match err {
        DbError::InvalidQuery { query, message } => {
            assert_eq!(query, "update_log");
            assert!(message.contains("6 placeholders for 7"));
        }
        other => panic!("expected InvalidQuery, got {other:?}"),
    }
}

#[tokio::test]
async fn test_duckdb_control_tables_roundtrip() {
    let db = DuckDbBackend::in_memory().unwrap();
    let provider = DuckDbQueryProvider;
    let schema = "ops";

    let exists = |table: &'static str| {
        vec![SqlValue::from(schema), SqlValue::from(table)]
    };
    let rows = db
        .query_rows(&provider.table_exists(), &exists(LOG_TABLE))
        .await
        .unwrap();
    assert!(!rows[0].get_bool(0).unwrap());

    db.execute_batch(&provider.create_control_tables(schema))
        .await
        .unwrap();
    // idempotent: no second lock row
    db.execute_batch(&provider.create_control_tables(schema))
        .await
        .unwrap();

    for table in [LOG_TABLE, LOCK_TABLE] {
        let rows = db
            .query_rows(&provider.table_exists(), &exists(table))
            .await
            .unwrap();
        assert!(rows[0].get_bool(0).unwrap(), "{table} should exist");
    }

    let lock_rows = db
        .query_rows(&format!("SELECT count(*) FROM {}", TableRef::new(schema, LOCK_TABLE)), &[])
        .await
        .unwrap();
    assert_eq!(lock_rows[0].get_i64(0).unwrap(), 1);

    assert_eq!(db.execute(&provider.acquire_lock(schema), &[]).await.unwrap(), 1);
    assert_eq!(db.execute(&provider.acquire_lock(schema), &[]).await.unwrap(), 0);
    let locked = db.query_rows(&provider.is_locked(schema), &[]).await.unwrap();
    assert!(locked[0].get_bool(0).unwrap());
    db.execute(&provider.release_lock(schema), &[]).await.unwrap();
    let locked = db.query_rows(&provider.is_locked(schema), &[]).await.unwrap();
    assert!(!locked[0].get_bool(0).unwrap());
}

#[tokio::test]
async fn test_duckdb_log_insert_update_select() {
    let db = DuckDbBackend::in_memory().unwrap();
    let provider = DuckDbQueryProvider;
    db.execute_batch(&provider.create_control_tables("main"))
        .await
        .unwrap();

    db.execute(
        &provider.insert_log("main"),
        &[
            "t1".into(),
            "v1.sql".into(),
            "alice".into(),
            "once".into(),
            0i64.into(),
            "abc".into(),
            "{}".into(),
        ],
    )
    .await
    .unwrap();

    let updated = db
        .execute(
            &provider.update_log("main"),
            &[
                "v2.sql".into(),
                "bob".into(),
                "always".into(),
                3i64.into(),
                "def".into(),
                r#"{"k":"v"}"#.into(),
                "t1".into(),
            ],
        )
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let rows = db.query_rows(&provider.select_log("main"), &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.len(), LOG_COLUMNS.len());
    assert_eq!(row.get_str(0).unwrap(), "t1");
    assert_eq!(row.get_str(1).unwrap(), "v2.sql");
    assert_eq!(row.get_str(2).unwrap(), "bob");
    assert_eq!(row.get_str(3).unwrap(), "always");
    assert_eq!(row.get_i64(4).unwrap(), 3);
    assert_eq!(row.get_str(5).unwrap(), "def");
    assert!(row.get_timestamp(6).unwrap().is_some());
    assert!(row.get_timestamp(7).unwrap().is_some());
    assert_eq!(row.get_opt_str(8).unwrap(), Some(r#"{"k":"v"}"#));

    db.execute(&provider.update_run_order("main"), &[7i64.into(), "t1".into()])
        .await
        .unwrap();
    let rows = db.query_rows(&provider.select_log("main"), &[]).await.unwrap();
    assert_eq!(rows[0].get_i64(4).unwrap(), 7);
    assert_eq!(rows[0].get_str(5).unwrap(), "def");
}
