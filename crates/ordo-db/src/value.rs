//! Backend-neutral parameter and result values

use crate::error::{DbError, DbResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::types::{TimeUnit, Value};

/// A bound parameter or a result cell
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    BigInt(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    fn type_name(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => format!("BOOLEAN {b}"),
            SqlValue::BigInt(i) => format!("BIGINT {i}"),
            SqlValue::Text(s) => format!("TEXT '{s}'"),
            SqlValue::Timestamp(ts) => format!("TIMESTAMP {ts}"),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::BigInt(i)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

impl From<&SqlValue> for Value {
    fn from(v: &SqlValue) -> Self {
        match v {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Boolean(*b),
            SqlValue::BigInt(i) => Value::BigInt(*i),
            SqlValue::Text(s) => Value::Text(s.clone()),
            SqlValue::Timestamp(ts) => {
                Value::Timestamp(TimeUnit::Microsecond, ts.timestamp_micros())
            }
        }
    }
}

impl From<Value> for SqlValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Boolean(b) => SqlValue::Bool(b),
            Value::TinyInt(i) => SqlValue::BigInt(i64::from(i)),
            Value::SmallInt(i) => SqlValue::BigInt(i64::from(i)),
            Value::Int(i) => SqlValue::BigInt(i64::from(i)),
            Value::BigInt(i) => SqlValue::BigInt(i),
            Value::UTinyInt(i) => SqlValue::BigInt(i64::from(i)),
            Value::USmallInt(i) => SqlValue::BigInt(i64::from(i)),
            Value::UInt(i) => SqlValue::BigInt(i64::from(i)),
            Value::UBigInt(i) => match i64::try_from(i) {
                Ok(i) => SqlValue::BigInt(i),
                Err(_) => SqlValue::Text(i.to_string()),
            },
            Value::HugeInt(i) => match i64::try_from(i) {
                Ok(i) => SqlValue::BigInt(i),
                Err(_) => SqlValue::Text(i.to_string()),
            },
            Value::Text(s) => SqlValue::Text(s),
            Value::Timestamp(unit, raw) => {
                let micros = match unit {
                    TimeUnit::Second => raw.saturating_mul(1_000_000),
                    TimeUnit::Millisecond => raw.saturating_mul(1_000),
                    TimeUnit::Microsecond => raw,
                    TimeUnit::Nanosecond => raw / 1_000,
                };
                DateTime::from_timestamp_micros(micros)
                    .map_or(SqlValue::Null, SqlValue::Timestamp)
            }
            other => SqlValue::Text(format!("{other:?}")),
        }
    }
}

/// One result row, read positionally
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(pub Vec<SqlValue>);

impl Row {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, column: usize) -> DbResult<&SqlValue> {
        self.0.get(column).ok_or_else(|| DbError::RowDecode {
            column,
            expected: "a value",
            found: format!("row with {} columns", self.0.len()),
        })
    }

    pub fn get_str(&self, column: usize) -> DbResult<&str> {
        match self.get(column)? {
            SqlValue::Text(s) => Ok(s),
            other => Err(mismatch(column, "TEXT", other)),
        }
    }

    pub fn get_opt_str(&self, column: usize) -> DbResult<Option<&str>> {
        match self.get(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s)),
            other => Err(mismatch(column, "TEXT or NULL", other)),
        }
    }

    pub fn get_i64(&self, column: usize) -> DbResult<i64> {
        match self.get(column)? {
            SqlValue::BigInt(i) => Ok(*i),
            other => Err(mismatch(column, "BIGINT", other)),
        }
    }

    pub fn get_bool(&self, column: usize) -> DbResult<bool> {
        match self.get(column)? {
            SqlValue::Bool(b) => Ok(*b),
            other => Err(mismatch(column, "BOOLEAN", other)),
        }
    }

    /// Timestamp cell; text in RFC 3339 or `YYYY-MM-DD HH:MM:SS[.f][+TZ]` is accepted
    pub fn get_timestamp(&self, column: usize) -> DbResult<Option<DateTime<Utc>>> {
        match self.get(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Timestamp(ts) => Ok(Some(*ts)),
            SqlValue::Text(s) => parse_timestamp(s)
                .map(Some)
                .ok_or_else(|| mismatch(column, "TIMESTAMP", &SqlValue::Text(s.clone()))),
            other => Err(mismatch(column, "TIMESTAMP", other)),
        }
    }
}

fn mismatch(column: usize, expected: &'static str, found: &SqlValue) -> DbError {
    DbError::RowDecode {
        column,
        expected,
        found: found.type_name(),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}

#[cfg(test)]
#[path = "value_test.rs"]
mod tests;
