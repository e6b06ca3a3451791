//! Positional row cursors.
//!
//! A `RowCursor` is the result set handed back by a record store query. It is
//! random-access, starts positioned before the first row, and must be closed
//! explicitly once the caller is done reading it.

use rxstore_core::{Error, Result, Row, RowId, Value, ValueKind};

/// A positional, random-access, explicitly closable view over query results.
pub trait RowCursor {
    /// Returns the number of rows in the result set.
    fn count(&self) -> usize;

    /// Returns the current position, or None when not on a row.
    fn position(&self) -> Option<usize>;

    /// Moves to an absolute position. Returns false if the position is out of range.
    fn move_to_position(&mut self, position: usize) -> bool;

    /// Moves to the next row. Returns false when there are no more rows.
    fn move_to_next(&mut self) -> bool;

    /// Returns the names of the projected columns.
    fn column_names(&self) -> &[String];

    /// Returns the value of a column on the current row.
    fn value(&self, column: usize) -> Option<&Value>;

    /// Returns the store identifier of the current row.
    fn row_id(&self) -> Option<RowId>;

    /// Releases the cursor. Reading a closed cursor yields no rows.
    fn close(&mut self);

    /// Returns true once `close` has been called.
    fn is_closed(&self) -> bool;

    /// Moves to the first row. Returns false for an empty result set.
    fn move_to_first(&mut self) -> bool {
        self.move_to_position(0)
    }

    /// Returns the index of a named column.
    fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names().iter().position(|c| c == name)
    }

    /// Returns the value of a named column on the current row.
    fn get(&self, name: &str) -> Result<&Value> {
        let index = self
            .column_index(name)
            .ok_or_else(|| Error::column_not_found(name))?;
        self.value(index)
            .ok_or_else(|| Error::invalid_operation("cursor is not positioned on a row"))
    }

    /// Reads a boolean column.
    fn get_bool(&self, name: &str) -> Result<bool> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| mismatch(name, ValueKind::Boolean, value))
    }

    /// Reads a 32-bit integer column.
    fn get_i32(&self, name: &str) -> Result<i32> {
        let value = self.get(name)?;
        value
            .as_i32()
            .ok_or_else(|| mismatch(name, ValueKind::Int32, value))
    }

    /// Reads a 64-bit integer column. 32-bit values are widened.
    fn get_i64(&self, name: &str) -> Result<i64> {
        let value = self.get(name)?;
        value
            .as_i64()
            .ok_or_else(|| mismatch(name, ValueKind::Int64, value))
    }

    /// Reads a floating point column.
    fn get_f32(&self, name: &str) -> Result<f32> {
        let value = self.get(name)?;
        value
            .as_f32()
            .ok_or_else(|| mismatch(name, ValueKind::Float32, value))
    }

    /// Reads a string column.
    fn get_string(&self, name: &str) -> Result<String> {
        let value = self.get(name)?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| mismatch(name, ValueKind::String, value))
    }

    /// Reads a nullable string column.
    fn get_optional_string(&self, name: &str) -> Result<Option<String>> {
        match self.get(name)? {
            Value::Null => Ok(None),
            value => value
                .as_str()
                .map(|s| Some(String::from(s)))
                .ok_or_else(|| mismatch(name, ValueKind::String, value)),
        }
    }
}

fn mismatch(column: &str, expected: ValueKind, value: &Value) -> Error {
    match value.kind() {
        Some(got) => Error::type_mismatch(column, expected, got),
        None => Error::invalid_operation(format!("column {} is null", column)),
    }
}

/// A cursor over rows materialized in memory.
#[derive(Debug)]
pub struct VecCursor {
    columns: Vec<String>,
    rows: Vec<Row>,
    position: Option<usize>,
    closed: bool,
}

impl VecCursor {
    /// Creates a cursor positioned before the first row.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            position: None,
            closed: false,
        }
    }

    /// Creates an empty cursor with the given columns.
    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }

    fn current(&self) -> Option<&Row> {
        if self.closed {
            return None;
        }
        self.position.and_then(|p| self.rows.get(p))
    }
}

impl RowCursor for VecCursor {
    fn count(&self) -> usize {
        if self.closed {
            0
        } else {
            self.rows.len()
        }
    }

    fn position(&self) -> Option<usize> {
        self.current().and(self.position)
    }

    fn move_to_position(&mut self, position: usize) -> bool {
        if self.closed || position >= self.rows.len() {
            return false;
        }
        self.position = Some(position);
        true
    }

    fn move_to_next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        if self.move_to_position(next) {
            true
        } else {
            // park after the last row
            self.position = Some(self.rows.len());
            false
        }
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn value(&self, column: usize) -> Option<&Value> {
        self.current().and_then(|row| row.get(column))
    }

    fn row_id(&self) -> Option<RowId> {
        self.current().map(Row::id)
    }

    fn close(&mut self) {
        self.closed = true;
        self.position = None;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
