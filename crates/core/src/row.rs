//! Records held by a record store.
//!
//! A `Row` pairs a table-unique id with its cells in column order. Stores keep
//! rows without the id cell and materialize it only for readers, through
//! [`Row::with_leading_id`].

use crate::value::Value;
use alloc::vec::Vec;

/// Table-unique record identifier. The last segment of an item `Uri`.
pub type RowId = u64;

/// One record: an id and its cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    id: RowId,
    cells: Vec<Value>,
}

impl Row {
    pub fn new(id: RowId, cells: Vec<Value>) -> Self {
        Self { id, cells }
    }

    #[inline]
    pub fn id(&self) -> RowId {
        self.id
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.cells
    }

    /// Returns the cell at `index`, or None past the last column.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.cells.get(index)
    }

    /// Replaces the cell at `index`. Returns false, leaving the row
    /// untouched, when the row has no such column.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.cells.get_mut(index) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Copy of this row with the id as an extra first cell.
    pub fn with_leading_id(&self) -> Row {
        let mut cells = Vec::with_capacity(self.cells.len() + 1);
        cells.push(Value::Int64(self.id as i64));
        cells.extend_from_slice(&self.cells);
        Row::new(self.id, cells)
    }

    /// Copy of this row holding only the cells at `indices`, in that order.
    /// Out-of-range indices read as `Null`.
    pub fn project(&self, indices: &[usize]) -> Row {
        let cells = indices
            .iter()
            .map(|&i| self.cells.get(i).cloned().unwrap_or(Value::Null))
            .collect();
        Row::new(self.id, cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn song() -> Row {
        Row::new(4, vec![Value::String("Intro".into()), Value::Int32(12)])
    }

    #[test]
    fn test_set_in_and_out_of_range() {
        let mut row = song();
        assert!(row.set(1, Value::Int32(13)));
        assert_eq!(row.get(1), Some(&Value::Int32(13)));
        assert!(!row.set(2, Value::Null));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_with_leading_id() {
        let view = song().with_leading_id();
        assert_eq!(view.id(), 4);
        assert_eq!(view.get(0), Some(&Value::Int64(4)));
        assert_eq!(view.get(1), Some(&Value::String("Intro".into())));
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_project_reorders_and_pads() {
        let view = song().project(&[1, 0, 5]);
        assert_eq!(view.values(), &[Value::Int32(12), Value::String("Intro".into()), Value::Null]);
        assert_eq!(view.id(), 4);
        assert!(Row::new(1, Vec::new()).project(&[]).is_empty());
    }
}
