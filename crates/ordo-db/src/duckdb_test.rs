use super::*;
use tempfile::TempDir;

async fn count(db: &DuckDbBackend, sql: &str) -> i64 {
    db.query_rows(sql, &[]).await.unwrap()[0].get_i64(0).unwrap()
}

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), DbType::DuckDb);
}

#[tokio::test]
async fn test_execute_with_params() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE users (id BIGINT, name VARCHAR, active BOOLEAN)")
        .await
        .unwrap();

    let inserted = db
        .execute(
            "INSERT INTO users VALUES (?, ?, ?)",
            &[SqlValue::BigInt(1), "ann".into(), true.into()],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let rows = db
        .query_rows("SELECT id, name, active FROM users WHERE id = ?", &[1i64.into()])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str(1).unwrap(), "ann");
    assert!(rows[0].get_bool(2).unwrap());
}

#[tokio::test]
async fn test_execute_batch() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE t1 (id INT); CREATE TABLE t2 (id INT); INSERT INTO t1 VALUES (1);",
    )
    .await
    .unwrap();

    assert_eq!(count(&db, "SELECT count(*) FROM t1").await, 1);
    assert_eq!(count(&db, "SELECT count(*) FROM t2").await, 0);
}

#[tokio::test]
async fn test_execution_error_includes_sql() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.execute_batch("SELEC 1").await.unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(ref msg) if msg.contains("SELEC 1")));
}

#[tokio::test]
async fn test_transaction_commit() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();

    let tx = db.begin().await.unwrap();
    tx.execute("INSERT INTO t VALUES (?)", &[1i64.into()])
        .await
        .unwrap();
    tx.execute_batch("INSERT INTO t VALUES (2)").await.unwrap();
    assert_eq!(
        tx.query_rows("SELECT count(*) FROM t", &[]).await.unwrap()[0]
            .get_i64(0)
            .unwrap(),
        2
    );
    tx.commit().await.unwrap();

    assert_eq!(count(&db, "SELECT count(*) FROM t").await, 2);
}

#[tokio::test]
async fn test_transaction_rollback() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();

    let tx = db.begin().await.unwrap();
    tx.execute_batch("INSERT INTO t VALUES (1)").await.unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(count(&db, "SELECT count(*) FROM t").await, 0);
}

#[tokio::test]
async fn test_transaction_rolls_back_on_drop() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();

    {
        let tx = db.begin().await.unwrap();
        tx.execute_batch("INSERT INTO t VALUES (1)").await.unwrap();
    }

    assert_eq!(count(&db, "SELECT count(*) FROM t").await, 0);
}

#[tokio::test]
async fn test_uncommitted_writes_are_isolated() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();

    let tx = db.begin().await.unwrap();
    tx.execute_batch("INSERT INTO t VALUES (1)").await.unwrap();
    assert_eq!(count(&db, "SELECT count(*) FROM t").await, 0);
    tx.commit().await.unwrap();
    assert_eq!(count(&db, "SELECT count(*) FROM t").await, 1);
}

#[tokio::test]
async fn test_file_database_persists() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ordo.duckdb");
    let path_str = path.to_str().unwrap();

    {
        let db = DuckDbBackend::new(path_str).unwrap();
        db.execute_batch("CREATE TABLE t AS SELECT 42 AS answer")
            .await
            .unwrap();
    }

    let db = DuckDbBackend::new(path_str).unwrap();
    assert_eq!(count(&db, "SELECT answer FROM t").await, 42);
}
