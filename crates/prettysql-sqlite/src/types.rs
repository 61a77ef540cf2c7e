//! Conversions between prettysql values and SQLite storage classes.
//!
//! SQLite stores every cell as NULL, INTEGER, REAL, TEXT or BLOB. Cells read
//! back are narrowed using the column's declared type, so a `SMALLINT`
//! column yields [`Value::SmallInt`] and a `DATE` column holding ISO text
//! yields [`Value::Date`]. Expressions without a declared type keep the
//! storage class.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use prettysql_common::{Decimal, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIMESTAMP_T_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Column type as declared in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    /// `BOOLEAN`, `BOOL`.
    Boolean,
    /// `TINYINT`.
    TinyInt,
    /// `SMALLINT`.
    SmallInt,
    /// `INTEGER`, `INT`, `MEDIUMINT`.
    Int,
    /// `BIGINT`.
    BigInt,
    /// `FLOAT`.
    Float,
    /// `DOUBLE`, `REAL`.
    Double,
    /// `DECIMAL`, `NUMERIC`.
    Decimal,
    /// `DATE`.
    Date,
    /// `TIME`.
    Time,
    /// `TIMESTAMP`, `DATETIME`.
    Timestamp,
    /// Anything else, including no declared type.
    Other,
}

impl DeclaredType {
    /// Classifies a declared type name.
    pub fn parse(decl: Option<&str>) -> Self {
        let Some(decl) = decl else {
            return DeclaredType::Other;
        };
        let decl = decl.to_uppercase();
        let has = |s: &str| decl.contains(s);

        if has("BOOL") {
            DeclaredType::Boolean
        } else if has("TINYINT") {
            DeclaredType::TinyInt
        } else if has("SMALLINT") {
            DeclaredType::SmallInt
        } else if has("BIGINT") {
            DeclaredType::BigInt
        } else if has("INT") {
            DeclaredType::Int
        } else if has("DOUBLE") || has("REAL") {
            DeclaredType::Double
        } else if has("FLOAT") {
            DeclaredType::Float
        } else if has("DECIMAL") || has("NUMERIC") {
            DeclaredType::Decimal
        } else if has("TIMESTAMP") || has("DATETIME") {
            DeclaredType::Timestamp
        } else if has("DATE") {
            DeclaredType::Date
        } else if has("TIME") {
            DeclaredType::Time
        } else {
            DeclaredType::Other
        }
    }
}

/// Converts a bound value to its SQLite representation.
pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::TinyInt(i) => SqlValue::Integer(i64::from(*i)),
        Value::SmallInt(i) => SqlValue::Integer(i64::from(*i)),
        Value::Int(i) => SqlValue::Integer(i64::from(*i)),
        Value::BigInt(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(f64::from(*f)),
        Value::Double(f) => SqlValue::Real(*f),
        Value::Decimal(d) => SqlValue::Text(d.to_string()),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Date(days) => match value.to_naive_date() {
            Some(date) => SqlValue::Text(date.format(DATE_FORMAT).to_string()),
            None => SqlValue::Integer(i64::from(*days)),
        },
        Value::Time(micros) => match value.to_naive_time() {
            Some(time) => SqlValue::Text(time.format(TIME_FORMAT).to_string()),
            None => SqlValue::Integer(*micros),
        },
        Value::Timestamp(micros) => match value.to_naive_date_time() {
            Some(ts) => SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
            None => SqlValue::Integer(*micros),
        },
    }
}

/// Converts a cell read from SQLite, narrowing by declared type.
pub fn from_sql(cell: ValueRef<'_>, declared: DeclaredType) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => from_integer(i, declared),
        ValueRef::Real(f) => from_real(f, declared),
        ValueRef::Text(bytes) => from_text(&String::from_utf8_lossy(bytes), declared),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

fn from_integer(i: i64, declared: DeclaredType) -> Value {
    match declared {
        DeclaredType::Boolean => Value::Boolean(i != 0),
        DeclaredType::TinyInt => i8::try_from(i).map_or(Value::BigInt(i), Value::TinyInt),
        DeclaredType::SmallInt => i16::try_from(i).map_or(Value::BigInt(i), Value::SmallInt),
        DeclaredType::Int => i32::try_from(i).map_or(Value::BigInt(i), Value::Int),
        DeclaredType::Float => Value::Float(i as f32),
        DeclaredType::Double => Value::Double(i as f64),
        DeclaredType::Decimal => Value::Decimal(Decimal::from(i)),
        _ => Value::BigInt(i),
    }
}

fn from_real(f: f64, declared: DeclaredType) -> Value {
    match declared {
        DeclaredType::Float => Value::Float(f as f32),
        DeclaredType::Decimal => {
            Decimal::from_str(&f.to_string()).map_or(Value::Double(f), Value::Decimal)
        }
        _ => Value::Double(f),
    }
}

fn from_text(text: &str, declared: DeclaredType) -> Value {
    let parsed = match declared {
        DeclaredType::Date => NaiveDate::parse_from_str(text, DATE_FORMAT).ok().map(Value::from),
        DeclaredType::Time => NaiveTime::parse_from_str(text, TIME_FORMAT).ok().map(Value::from),
        DeclaredType::Timestamp => NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(text, TIMESTAMP_T_FORMAT))
            .ok()
            .map(Value::from),
        DeclaredType::Decimal => Decimal::from_str(text).ok().map(Value::Decimal),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_parse() {
        assert_eq!(DeclaredType::parse(Some("INTEGER")), DeclaredType::Int);
        assert_eq!(DeclaredType::parse(Some("smallint")), DeclaredType::SmallInt);
        assert_eq!(DeclaredType::parse(Some("CHARACTER VARYING(120)")), DeclaredType::Other);
        assert_eq!(DeclaredType::parse(Some("DATETIME")), DeclaredType::Timestamp);
        assert_eq!(DeclaredType::parse(Some("DATE")), DeclaredType::Date);
        assert_eq!(DeclaredType::parse(Some("NUMERIC(10,2)")), DeclaredType::Decimal);
        assert_eq!(DeclaredType::parse(Some("BOOLEAN")), DeclaredType::Boolean);
        assert_eq!(DeclaredType::parse(None), DeclaredType::Other);
    }

    #[test]
    fn test_integer_narrowing() {
        assert_eq!(from_sql(ValueRef::Integer(2001), DeclaredType::SmallInt), Value::SmallInt(2001));
        assert_eq!(from_sql(ValueRef::Integer(1), DeclaredType::Int), Value::Int(1));
        assert_eq!(from_sql(ValueRef::Integer(70_000), DeclaredType::SmallInt), Value::BigInt(70_000));
        assert_eq!(from_sql(ValueRef::Integer(3), DeclaredType::Other), Value::BigInt(3));
        assert_eq!(from_sql(ValueRef::Integer(1), DeclaredType::Boolean), Value::Boolean(true));
    }

    #[test]
    fn test_text_narrowing() {
        let date = NaiveDate::from_ymd_opt(2001, 12, 19).unwrap();
        assert_eq!(from_sql(ValueRef::Text(b"2001-12-19"), DeclaredType::Date), Value::from(date));
        assert_eq!(
            from_sql(ValueRef::Text(b"not a date"), DeclaredType::Date),
            Value::string("not a date")
        );
        assert_eq!(
            from_sql(ValueRef::Text(b"12.50"), DeclaredType::Decimal),
            Value::Decimal(Decimal::new(1250, 2))
        );
        assert_eq!(from_sql(ValueRef::Null, DeclaredType::Date), Value::Null);
    }

    #[test]
    fn test_temporal_values_bind_as_text() {
        let ts = NaiveDate::from_ymd_opt(2003, 12, 17)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        let bound = to_sql(&Value::from(ts));
        assert_eq!(bound, SqlValue::Text("2003-12-17 20:00:00".into()));

        let SqlValue::Text(text) = bound else {
            panic!("timestamp must bind as text");
        };
        assert_eq!(
            from_sql(ValueRef::Text(text.as_bytes()), DeclaredType::Timestamp),
            Value::from(ts)
        );
    }

    #[test]
    fn test_scalars_bind() {
        assert_eq!(to_sql(&Value::Boolean(true)), SqlValue::Integer(1));
        assert_eq!(to_sql(&Value::SmallInt(2002)), SqlValue::Integer(2002));
        assert_eq!(to_sql(&Value::Null), SqlValue::Null);
        assert_eq!(to_sql(&Value::Decimal(Decimal::new(-5, 1))), SqlValue::Text("-0.5".into()));
    }
}
