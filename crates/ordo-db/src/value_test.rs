use super::*;
use chrono::TimeZone;

#[test]
fn test_row_getters() {
    let row = Row(vec![
        SqlValue::Text("t1".into()),
        SqlValue::BigInt(3),
        SqlValue::Bool(true),
        SqlValue::Null,
    ]);
    assert_eq!(row.get_str(0).unwrap(), "t1");
    assert_eq!(row.get_i64(1).unwrap(), 3);
    assert!(row.get_bool(2).unwrap());
    assert_eq!(row.get_opt_str(3).unwrap(), None);
    assert_eq!(row.get_timestamp(3).unwrap(), None);
}

#[test]
fn test_row_type_mismatch() {
    let row = Row(vec![SqlValue::BigInt(1)]);
    let err = row.get_str(0).unwrap_err();
    assert!(matches!(err, DbError::RowDecode { column: 0, .. }));
    assert!(err.to_string().contains("BIGINT 1"));
    assert!(row.get_i64(5).is_err());
}

#[test]
fn test_timestamp_from_text() {
    let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
    for text in [
        "2024-05-01T12:30:00Z",
        "2024-05-01 12:30:00+00",
        "2024-05-01 14:30:00+02",
        "2024-05-01 12:30:00",
    ] {
        let row = Row(vec![SqlValue::Text(text.into())]);
        assert_eq!(row.get_timestamp(0).unwrap(), Some(expected), "{text}");
    }
}

#[test]
fn test_duckdb_value_conversion() {
    assert_eq!(SqlValue::from(Value::Int(7)), SqlValue::BigInt(7));
    assert_eq!(SqlValue::from(Value::Boolean(false)), SqlValue::Bool(false));
    assert_eq!(SqlValue::from(Value::Null), SqlValue::Null);

    let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let value = Value::from(&SqlValue::Timestamp(ts));
    assert_eq!(SqlValue::from(value), SqlValue::Timestamp(ts));
}

#[test]
fn test_option_into_sql_value() {
    assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
    assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
}
