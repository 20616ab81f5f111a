//! Ordered rows and row batches.
//!
//! A `Row` keeps its cells in column order because encoders write them in that
//! order; lookups are by name. Rows are narrow in practice, so a linear scan
//! beats hashing here.

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            cells: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.cells.iter().position(|(n, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.cells.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.cells
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Missing columns read as Null.
    pub fn value(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.get(name).unwrap_or(&NULL)
    }

    /// Replace in place if the column exists, otherwise append.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.cells.push((name, value)),
        }
    }

    /// Append without checking for an existing column of the same name.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.cells.push((name.into(), value));
    }

    /// Insert at `index` (clamped), or replace in place if the name exists.
    pub fn insert(&mut self, index: usize, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.get_mut(&name) {
            *slot = value;
            return;
        }
        let index = index.min(self.cells.len());
        self.cells.insert(index, (name, value));
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let i = self.position(name)?;
        Some(self.cells.remove(i).1)
    }

    /// Rename keeping position. Returns false if `old` is absent.
    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> bool {
        match self.cells.iter_mut().find(|(n, _)| n == old) {
            Some(cell) => {
                cell.0 = new.into();
                true
            }
            None => false,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.cells.iter_mut().map(|(n, v)| (n.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.set(k, v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

/// An ordered run of rows. Batch boundaries carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub rows: Vec<Row>,
}

impl RowBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            rows: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn extend(&mut self, other: RowBatch) {
        self.rows.extend(other.rows);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Column names in first-seen order across all rows.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for row in &self.rows {
            for c in row.columns() {
                if !names.iter().any(|n| n == c) {
                    names.push(c.to_string());
                }
            }
        }
        names
    }
}

impl From<Vec<Row>> for RowBatch {
    fn from(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

impl IntoIterator for RowBatch {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a RowBatch {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_row() -> Row {
        Row::from_iter([("name", Value::from("Alice")), ("age", Value::Int(30))])
    }

    #[test]
    fn set_replaces_in_place() {
        let mut row = mk_row();
        row.set("name", Value::from("Bob"));
        row.set("city", Value::from("Oslo"));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["name", "age", "city"]);
        assert_eq!(row.value("name"), &Value::from("Bob"));
    }

    #[test]
    fn rename_keeps_position() {
        let mut row = mk_row();
        assert!(row.rename("name", "who"));
        assert!(!row.rename("missing", "x"));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["who", "age"]);
    }

    #[test]
    fn missing_reads_null() {
        let row = mk_row();
        assert_eq!(row.value("nope"), &Value::Null);
    }

    #[test]
    fn batch_column_names_union() {
        let mut other = Row::new();
        other.set("zip", Value::Int(1));
        let batch = RowBatch::from(vec![mk_row(), other]);
        assert_eq!(batch.column_names(), vec!["name", "age", "zip"]);
    }
}
