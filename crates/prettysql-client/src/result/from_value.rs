//! Typed extraction of cell values.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use prettysql_common::{Decimal, Value};

use crate::error::{ClientError, ClientResult};

/// Converts a cell into a Rust type.
///
/// `Null` converts to `Ok(None)` for every type. A non-null value of another
/// SQL type is a [`ClientError::TypeMismatch`].
pub trait FromValue: Sized {
    /// SQL type name reported on mismatch.
    const SQL_TYPE: &'static str;

    /// Converts `value`.
    fn from_value(value: &Value) -> ClientResult<Option<Self>>;
}

fn mismatch<T: FromValue>(value: &Value) -> ClientError {
    ClientError::TypeMismatch {
        expected: T::SQL_TYPE,
        found: value.type_name(),
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident, $sql:literal),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const SQL_TYPE: &'static str = $sql;

                fn from_value(value: &Value) -> ClientResult<Option<Self>> {
                    match value {
                        Value::Null => Ok(None),
                        Value::$variant(v) => Ok(Some(v.to_owned())),
                        other => Err(mismatch::<Self>(other)),
                    }
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Boolean, "BOOLEAN",
    i8 => TinyInt, "TINYINT",
    i16 => SmallInt, "SMALLINT",
    i32 => Int, "INTEGER",
    i64 => BigInt, "BIGINT",
    f32 => Float, "FLOAT",
    f64 => Double, "DOUBLE",
    Decimal => Decimal, "DECIMAL",
    String => String, "VARCHAR",
    Vec<u8> => Bytes, "VARBINARY",
}

impl FromValue for Value {
    const SQL_TYPE: &'static str = "ANY";

    fn from_value(value: &Value) -> ClientResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            other => Ok(Some(other.clone())),
        }
    }
}

impl FromValue for NaiveDate {
    const SQL_TYPE: &'static str = "DATE";

    fn from_value(value: &Value) -> ClientResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Date(days) => value
                .to_naive_date()
                .map(Some)
                .ok_or_else(|| ClientError::InvalidValue(format!("date out of range: {days} days"))),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromValue for NaiveTime {
    const SQL_TYPE: &'static str = "TIME";

    fn from_value(value: &Value) -> ClientResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Time(micros) => value
                .to_naive_time()
                .map(Some)
                .ok_or_else(|| ClientError::InvalidValue(format!("time out of range: {micros} us"))),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    const SQL_TYPE: &'static str = "TIMESTAMP";

    fn from_value(value: &Value) -> ClientResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Timestamp(micros) => value.to_naive_date_time().map(Some).ok_or_else(|| {
                ClientError::InvalidValue(format!("timestamp out of range: {micros} us"))
            }),
            other => Err(mismatch::<Self>(other)),
        }
    }
}
