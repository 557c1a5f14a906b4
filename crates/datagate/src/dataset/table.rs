//! Typed, read-only tabular snapshot.

use std::borrow::Cow;
use std::mem::size_of;

use serde::{Deserialize, Serialize};

/// Tokens that load as an explicit null.
const NULL_TOKENS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Kind of a column after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Free text values.
    Text,
    /// Every non-null value is a number.
    Numeric,
}

impl ColumnKind {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Numeric => "numeric",
        }
    }
}

/// Name and kind of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
}

impl Value {
    /// Classify a raw cell from the source file.
    ///
    /// Empty, whitespace-only and the usual NA tokens become [`Value::Null`];
    /// everything else is kept as text. Numeric conversion happens per column
    /// in the loader, once the column kind is known.
    pub fn from_raw(raw: &str) -> Self {
        if is_null_token(raw) {
            Value::Null
        } else {
            Value::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content, accepting text with a `.` or `,` decimal separator.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_decimal(s),
            Value::Null => None,
        }
    }

    /// Canonical text rendering. `None` for nulls.
    pub fn render(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(Cow::Borrowed(s)),
            Value::Number(n) => Some(Cow::Owned(format_number(*n))),
        }
    }

    /// Estimated heap + inline footprint of this cell in bytes.
    pub fn memory_estimate(&self) -> usize {
        match self {
            Value::Text(s) => size_of::<Value>() + s.len(),
            _ => size_of::<Value>(),
        }
    }
}

/// Check if a raw cell represents a missing value.
pub fn is_null_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NULL_TOKENS.contains(&trimmed)
}

/// Parse a number that may use a comma as decimal separator.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Render a number the same way regardless of how it was written in the source.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Collapse -0.0
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

/// One data row. `index` is the 1-based data row number in the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index: usize,
    pub values: Vec<Value>,
}

/// Immutable tabular dataset shared by every validator of a run.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Row>,
}

impl DataTable {
    /// Create a table. Rows are padded with nulls or truncated to the column count.
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.values.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a text table from string cells, numbering rows from 1 and inferring
    /// numeric columns. Mostly useful in tests and benches.
    pub fn from_strings(headers: &[&str], rows: &[Vec<&str>]) -> Self {
        let raw_rows: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect();
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        super::loader::build_table(headers, raw_rows, &Default::default())
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Descriptor of a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Iterate `(row_index, value)` pairs for a column position.
    pub fn values(&self, col: usize) -> impl Iterator<Item = (usize, &Value)> {
        self.rows
            .iter()
            .filter_map(move |row| row.values.get(col).map(|v| (row.index, v)))
    }

    /// Iterate `(row_index, value)` pairs for a column name.
    pub fn values_by_name(&self, name: &str) -> Option<impl Iterator<Item = (usize, &Value)>> {
        let col = self.column_index(name)?;
        Some(self.values(col))
    }

    /// Get a specific cell by row position (not row index) and column position.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.values.get(col))
    }

    /// Number of null cells in a column.
    pub fn column_null_count(&self, col: usize) -> usize {
        self.values(col).filter(|(_, v)| v.is_null()).count()
    }

    /// Number of null cells in the whole table.
    pub fn null_cell_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.values.iter().filter(|v| v.is_null()).count())
            .sum()
    }

    /// Null cells over total cells. Zero for an empty table.
    pub fn null_ratio(&self) -> f64 {
        let cells = self.row_count() * self.column_count();
        if cells == 0 {
            0.0
        } else {
            self.null_cell_count() as f64 / cells as f64
        }
    }

    /// Estimated memory of one column in bytes.
    pub fn column_memory(&self, col: usize) -> usize {
        self.columns
            .get(col)
            .map(|c| c.name.len() + size_of::<ColumnDescriptor>())
            .unwrap_or(0)
            + self.values(col).map(|(_, v)| v.memory_estimate()).sum::<usize>()
    }

    /// Estimated memory of the whole table in bytes.
    ///
    /// Deterministic: depends only on the table content, never on allocator state.
    pub fn memory_estimate(&self) -> usize {
        let per_row = self.rows.len() * size_of::<Row>();
        per_row
            + (0..self.column_count())
                .map(|c| self.column_memory(c))
                .sum::<usize>()
    }
}
