use serde::{Deserialize, Serialize};

/// An untyped input table: a header row plus string cells.
///
/// Spreadsheet and CSV readers produce this; the core never sees file formats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self { name: name.into(), headers, rows: Vec::new() }
    }

    /// Build a table from string slices (handy for fixtures).
    pub fn from_rows(name: impl Into<String>, headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Trimmed cell value; missing cells read as empty.
pub(crate) fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(|s| s.trim()).unwrap_or("")
}
