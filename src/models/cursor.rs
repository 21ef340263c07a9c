use serde::{Deserialize, Serialize};

/// One cell of a [`MatrixCursor`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CursorValue {
    Null,
    Integer(i64),
    Text(String),
}

impl From<&str> for CursorValue {
    fn from(s: &str) -> Self {
        CursorValue::Text(s.to_string())
    }
}

impl From<String> for CursorValue {
    fn from(s: String) -> Self {
        CursorValue::Text(s)
    }
}

impl From<Option<String>> for CursorValue {
    fn from(s: Option<String>) -> Self {
        s.map_or(CursorValue::Null, CursorValue::Text)
    }
}

impl From<bool> for CursorValue {
    fn from(b: bool) -> Self {
        CursorValue::Integer(i64::from(b))
    }
}

/// In-memory table handed to content consumers: fixed column names, rows of values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatrixCursor {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CursorValue>>,
}

impl MatrixCursor {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Rows must have one value per column.
    pub fn add_row(&mut self, row: Vec<CursorValue>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&CursorValue> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    pub fn get_string(&self, row: usize, column: &str) -> Option<&str> {
        match self.get(row, column)? {
            CursorValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, row: usize, column: &str) -> Option<i64> {
        match self.get(row, column)? {
            CursorValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}
