//! Result mappers.
//!
//! A [`ResultMapper`] turns the current row of a
//! [`CachedScrollableResult`] into a value. Closures taking the result are
//! mappers:
//!
//! ```rust
//! use prettysql_client::{CachedScrollableResult, ClientResult};
//!
//! struct Film {
//!     id: i32,
//!     name: Option<String>,
//! }
//!
//! let film_mapper = |row: &CachedScrollableResult| -> ClientResult<Film> {
//!     Ok(Film {
//!         id: row.get::<i32>(1)?.unwrap_or_default(),
//!         name: row.get_by_name("original_name")?,
//!     })
//! };
//! # let _ = film_mapper;
//! ```

use std::marker::PhantomData;

use crate::error::ClientResult;
use crate::result::{CachedScrollableResult, FromValue};

/// Maps the current row of a result to a `T`.
pub trait ResultMapper<T>: Send {
    /// Maps the row under the cursor.
    fn map(&self, row: &CachedScrollableResult) -> ClientResult<T>;
}

impl<T, F> ResultMapper<T> for F
where
    F: Fn(&CachedScrollableResult) -> ClientResult<T> + Send,
{
    fn map(&self, row: &CachedScrollableResult) -> ClientResult<T> {
        self(row)
    }
}

/// Mapper reading column 1 as `T`.
#[derive(Debug)]
pub struct FirstColumn<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for FirstColumn<T> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: FromValue> ResultMapper<Option<T>> for FirstColumn<T> {
    fn map(&self, row: &CachedScrollableResult) -> ClientResult<Option<T>> {
        row.get::<T>(1)
    }
}

/// Returns a mapper reading column 1 as `T`, `None` for NULL.
pub fn first_column<T: FromValue>() -> FirstColumn<T> {
    FirstColumn::default()
}
