//! Cached scrollable results.
//!
//! A [`CachedScrollableResult`] drains a driver row stream completely and
//! stores it column-major, so the statement that produced it can be closed or
//! re-executed while the result stays readable. The cursor starts before the
//! first row and moves freely in both directions.
//!
//! ```text
//!   cursor:  -1 | 0 .. row_count-1 | row_count
//!          before    valid rows     after
//! ```

mod from_value;

pub use from_value::FromValue;

use std::collections::HashMap;

use prettysql_common::{Value, DEFAULT_ROW_CAPACITY_HINT, MAX_ROW_CAPACITY_HINT};

use crate::driver::RowStream;
use crate::error::{ClientError, ClientResult};

/// A fully materialized, bidirectionally navigable result.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedScrollableResult {
    /// Column labels in result order.
    column_names: Vec<String>,
    /// Lower-cased label to 0-based column index. First occurrence wins.
    column_index: HashMap<String, usize>,
    /// One vector of cells per column.
    columns: Vec<Vec<Value>>,
    row_count: usize,
    cursor: isize,
}

impl CachedScrollableResult {
    /// Drains `stream` into a new result.
    ///
    /// A stream error aborts construction; no partial result is returned.
    pub fn from_stream<S>(stream: &mut S, capacity_hint: usize) -> ClientResult<Self>
    where
        S: RowStream + ?Sized,
    {
        let column_names = stream.columns().to_vec();
        let mut result = Self::empty(column_names, capacity_hint);

        while let Some(row) = stream.next_row()? {
            result.push_row(row)?;
        }

        Ok(result)
    }

    /// Builds a result from rows already in memory.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<Value>>) -> ClientResult<Self> {
        let mut result = Self::empty(column_names, rows.len());
        for row in rows {
            result.push_row(row)?;
        }
        Ok(result)
    }

    fn empty(column_names: Vec<String>, capacity_hint: usize) -> Self {
        let capacity = match capacity_hint {
            0 => DEFAULT_ROW_CAPACITY_HINT,
            hint => hint.min(MAX_ROW_CAPACITY_HINT),
        };

        let mut column_index = HashMap::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            column_index.entry(name.to_lowercase()).or_insert(i);
        }

        let columns = (0..column_names.len())
            .map(|_| Vec::with_capacity(capacity))
            .collect();

        Self {
            column_names,
            column_index,
            columns,
            row_count: 0,
            cursor: -1,
        }
    }

    fn push_row(&mut self, row: Vec<Value>) -> ClientResult<()> {
        if row.len() != self.columns.len() {
            return Err(ClientError::driver(
                "fetch",
                format!(
                    "row has {} values, result has {} columns",
                    row.len(),
                    self.columns.len()
                ),
            ));
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(value);
        }
        self.row_count += 1;
        Ok(())
    }

    // =========================================================================
    // Shape
    // =========================================================================

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Column labels in result order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Returns the 1-based index of a column, ignoring case.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.column_index.get(&name.to_lowercase()).map(|i| i + 1)
    }

    /// Returns true if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Current cursor position: `-1` before the first row, `row_count` after
    /// the last.
    pub fn row_index(&self) -> isize {
        self.cursor
    }

    fn end(&self) -> isize {
        self.row_count as isize
    }

    /// Moves to the next row. Returns false once past the last row.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.cursor < self.end() {
            self.cursor += 1;
        }
        self.cursor < self.end()
    }

    /// Moves to the previous row. Returns false once before the first row.
    pub fn previous(&mut self) -> bool {
        if self.cursor >= 0 {
            self.cursor -= 1;
        }
        self.cursor >= 0
    }

    /// Moves to the first row.
    pub fn first(&mut self) -> bool {
        self.cursor = 0;
        self.cursor < self.end()
    }

    /// Moves to the last row.
    pub fn last(&mut self) -> bool {
        self.cursor = self.end() - 1;
        self.cursor >= 0
    }

    /// Moves before the first row.
    pub fn before_first(&mut self) {
        self.cursor = -1;
    }

    /// Moves after the last row.
    pub fn after_last(&mut self) {
        self.cursor = self.end();
    }

    /// Returns true if the cursor is before the first row.
    pub fn is_before_first(&self) -> bool {
        self.cursor < 0
    }

    /// Returns true if the cursor is after the last row.
    pub fn is_after_last(&self) -> bool {
        self.cursor >= self.end()
    }

    /// Returns true if the cursor is on the first row.
    pub fn is_first(&self) -> bool {
        self.row_count > 0 && self.cursor == 0
    }

    /// Returns true if the cursor is on the last row.
    pub fn is_last(&self) -> bool {
        self.row_count > 0 && self.cursor == self.end() - 1
    }

    /// Returns true if the cursor is on a row.
    pub fn has_current_row(&self) -> bool {
        self.cursor >= 0 && self.cursor < self.end()
    }

    // =========================================================================
    // Cell Access
    // =========================================================================

    fn current_row(&self) -> ClientResult<usize> {
        if self.has_current_row() {
            Ok(self.cursor as usize)
        } else {
            Err(ClientError::NoCurrentRow(self.cursor))
        }
    }

    /// Returns the cell in 1-based column `index` of the current row.
    pub fn get_value(&self, index: usize) -> ClientResult<&Value> {
        if index == 0 || index > self.columns.len() {
            return Err(ClientError::ColumnIndexOutOfBounds {
                index,
                count: self.columns.len(),
            });
        }
        let row = self.current_row()?;
        Ok(&self.columns[index - 1][row])
    }

    /// Returns the cell in the named column of the current row, or `None` if
    /// no column has that name.
    pub fn get_value_by_name(&self, name: &str) -> ClientResult<Option<&Value>> {
        match self.find_column(name) {
            Some(index) => self.get_value(index).map(Some),
            None => Ok(None),
        }
    }

    /// Reads 1-based column `index` of the current row as `T`.
    pub fn get<T: FromValue>(&self, index: usize) -> ClientResult<Option<T>> {
        T::from_value(self.get_value(index)?)
    }

    /// Reads the named column of the current row as `T`. An unknown name
    /// reads as `None`.
    pub fn get_by_name<T: FromValue>(&self, name: &str) -> ClientResult<Option<T>> {
        match self.get_value_by_name(name)? {
            Some(value) => T::from_value(value),
            None => Ok(None),
        }
    }

    /// Returns a copy of the current row.
    pub fn current_values(&self) -> ClientResult<Vec<Value>> {
        let row = self.current_row()?;
        Ok(self.columns.iter().map(|c| c[row].clone()).collect())
    }
}
