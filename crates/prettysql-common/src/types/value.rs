//! Runtime values exchanged with a driver.
//!
//! A [`Value`] is a single cell read from a result row or a single parameter
//! bound to a statement. Temporal variants keep the raw driver encoding
//! (days / microseconds); the `chrono` conversions derive the calendar types
//! from it.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::Decimal;
use crate::constants::{MICROS_PER_DAY, MICROS_PER_SECOND, UNIX_EPOCH_DAYS_FROM_CE};

/// A dynamically-typed SQL value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 8-bit signed integer.
    TinyInt(i8),
    /// 16-bit signed integer.
    SmallInt(i16),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    BigInt(i64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// Exact decimal.
    Decimal(Decimal),
    /// String value.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Date (days since 1970-01-01).
    Date(i32),
    /// Time (microseconds since midnight).
    Time(i64),
    /// Timestamp (microseconds since 1970-01-01T00:00:00).
    Timestamp(i64),
}

impl Value {
    /// Creates a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Value::String(v.into())
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the SQL name of this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOLEAN",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Float(_) => "FLOAT",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::String(_) => "VARCHAR",
            Value::Bytes(_) => "VARBINARY",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }

    /// Tries to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Widens any integer variant to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(i) => Some(*i as i64),
            Value::SmallInt(i) => Some(*i as i64),
            Value::Int(i) => Some(*i as i64),
            Value::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    /// Widens any floating variant to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f as f64),
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Tries to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Tries to get as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Converts a raw `Date` cell to a calendar date.
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(days) => {
                NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
            }
            _ => None,
        }
    }

    /// Converts a raw `Time` cell to a wall-clock time.
    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(micros) if (0..MICROS_PER_DAY).contains(micros) => {
                let secs = (micros / MICROS_PER_SECOND) as u32;
                let nanos = ((micros % MICROS_PER_SECOND) * 1_000) as u32;
                NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
            }
            _ => None,
        }
    }

    /// Converts a raw `Timestamp` cell to a local date-time.
    pub fn to_naive_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(micros) => {
                let secs = micros.div_euclid(MICROS_PER_SECOND);
                let nanos = (micros.rem_euclid(MICROS_PER_SECOND) * 1_000) as u32;
                DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::TinyInt(i) => write!(f, "{}", i),
            Value::SmallInt(i) => write!(f, "{}", i),
            Value::Int(i) => write!(f, "{}", i),
            Value::BigInt(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(_) => match self.to_naive_date() {
                Some(d) => write!(f, "{}", d),
                None => write!(f, "date:{}", self.raw_temporal()),
            },
            Value::Time(_) => match self.to_naive_time() {
                Some(t) => write!(f, "{}", t),
                None => write!(f, "time:{}", self.raw_temporal()),
            },
            Value::Timestamp(_) => match self.to_naive_date_time() {
                Some(ts) => write!(f, "{}", ts),
                None => write!(f, "ts:{}", self.raw_temporal()),
            },
        }
    }
}

impl Value {
    fn raw_temporal(&self) -> i64 {
        match self {
            Value::Date(d) => *d as i64,
            Value::Time(t) | Value::Timestamp(t) => *t,
            _ => 0,
        }
    }
}

// Implement Into<Value> for common types

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Boolean,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        let micros = v.num_seconds_from_midnight() as i64 * MICROS_PER_SECOND
            + (v.nanosecond() / 1_000) as i64;
        Value::Time(micros)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v.and_utc().timestamp_micros())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null() {
        let v = Value::default();
        assert!(v.is_null());
        assert_eq!(v.type_name(), "NULL");
        assert_eq!(v.to_string(), "NULL");
    }

    #[test]
    fn test_value_from_types() {
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from(7i8), Value::TinyInt(7));
        assert_eq!(Value::from(2002i16), Value::SmallInt(2002));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(42i64), Value::BigInt(42));
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(Some(3i32)), Value::Int(3));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(Value::SmallInt(5).as_i64(), Some(5));
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
        assert!(Value::string("5").as_i64().is_none());
    }

    #[test]
    fn test_date_conversion() {
        let date = NaiveDate::from_ymd_opt(2001, 12, 19).unwrap();
        let value = Value::from(date);
        assert!(matches!(value, Value::Date(_)));
        assert_eq!(value.to_naive_date(), Some(date));
        assert_eq!(Value::Date(0).to_naive_date(), NaiveDate::from_ymd_opt(1970, 1, 1));
        assert_eq!(value.to_string(), "2001-12-19");
    }

    #[test]
    fn test_time_conversion() {
        let time = NaiveTime::from_hms_micro_opt(13, 45, 30, 250).unwrap();
        let value = Value::from(time);
        assert_eq!(value.to_naive_time(), Some(time));
        assert!(Value::Time(MICROS_PER_DAY).to_naive_time().is_none());
    }

    #[test]
    fn test_timestamp_conversion() {
        let ts = NaiveDate::from_ymd_opt(1969, 7, 20)
            .unwrap()
            .and_hms_micro_opt(20, 17, 40, 5)
            .unwrap();
        let value = Value::from(ts);
        assert_eq!(value.to_naive_date_time(), Some(ts));
        assert_eq!(Value::Timestamp(0).to_string(), "1970-01-01 00:00:00");
    }

    #[test]
    fn test_temporal_accessors_reject_other_types() {
        assert!(Value::Int(1).to_naive_date().is_none());
        assert!(Value::Null.to_naive_time().is_none());
        assert!(Value::Date(1).to_naive_date_time().is_none());
    }
}
