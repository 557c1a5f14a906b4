//! Delimited text loader with delimiter detection and column kind inference.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::table::{ColumnDescriptor, ColumnKind, DataTable, Row, Value, parse_decimal};
use crate::error::{DatagateError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Extensions we recognise but do not read.
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "ods", "parquet"];

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Quote character.
    pub quote: u8,
    /// Force a kind for named columns instead of inferring it.
    pub kind_overrides: HashMap<String, ColumnKind>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: b'"',
            kind_overrides: HashMap::new(),
        }
    }
}

impl LoaderConfig {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_kind_overrides(mut self, overrides: HashMap<String, ColumnKind>) -> Self {
        self.kind_overrides = overrides;
        self
    }
}

/// Metadata about a loaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadStats {
    /// File name without directory.
    pub file: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Detected format (tsv, csv, csv-semicolon, psv).
    pub format: String,
    /// SHA-256 of the raw file bytes.
    pub file_hash: String,
    pub row_count: usize,
    pub column_count: usize,
    /// Seconds spent reading and typing the file.
    pub load_duration: f64,
}

/// Loads tabular data files into a [`DataTable`].
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    /// Create a new loader with default configuration.
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    /// Create a loader with custom configuration.
    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Load a file and return the data table and load statistics.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(DataTable, LoadStats)> {
        let path = path.as_ref();
        let started = Instant::now();

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
            return Err(DatagateError::UnsupportedFormat(format!(
                "'{}' is a .{} file; export it to CSV or TSV first",
                path.display(),
                extension
            )));
        }

        let contents = fs::read(path).map_err(|e| DatagateError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let file_hash = format!("sha256:{:x}", hasher.finalize());

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(&contents)?,
        };
        debug!(path = %path.display(), delimiter = %(delimiter as char).escape_default(), "loading dataset");

        let table = self.parse_bytes_with(&contents, delimiter)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        let stats = LoadStats {
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            size_bytes: contents.len() as u64,
            format,
            file_hash,
            row_count: table.row_count(),
            column_count: table.column_count(),
            load_duration: started.elapsed().as_secs_f64(),
        };

        Ok((table, stats))
    }

    /// Parse in-memory bytes, detecting the delimiter unless one is configured.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<DataTable> {
        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(bytes)?,
        };
        self.parse_bytes_with(bytes, delimiter)
    }

    fn parse_bytes_with(&self, bytes: &[u8], delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|s| s.trim_start_matches('\u{feff}').to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(DatagateError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(expected_cols, String::new());
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(DatagateError::EmptyData("No data rows found".to_string()));
        }

        Ok(build_table(headers, rows, &self.config))
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Type raw string rows into a [`DataTable`].
pub(crate) fn build_table(
    headers: Vec<String>,
    raw_rows: Vec<Vec<String>>,
    config: &LoaderConfig,
) -> DataTable {
    let kinds: Vec<ColumnKind> = headers
        .iter()
        .enumerate()
        .map(|(col, name)| match config.kind_overrides.get(name) {
            Some(kind) => *kind,
            None => infer_kind(raw_rows.iter().filter_map(|r| r.get(col).map(String::as_str))),
        })
        .collect();

    let rows = raw_rows
        .into_iter()
        .enumerate()
        .map(|(i, raw)| Row {
            index: i + 1,
            values: raw
                .iter()
                .zip(&kinds)
                .map(|(cell, kind)| type_cell(cell, *kind))
                .collect(),
        })
        .collect();

    let columns = headers
        .into_iter()
        .zip(kinds)
        .map(|(name, kind)| ColumnDescriptor::new(name, kind))
        .collect();

    DataTable::new(columns, rows)
}

fn type_cell(raw: &str, kind: ColumnKind) -> Value {
    match Value::from_raw(raw) {
        Value::Text(text) if kind == ColumnKind::Numeric => match parse_decimal(&text) {
            Some(n) => Value::Number(n),
            None => Value::Text(text),
        },
        other => other,
    }
}

/// A column is numeric when it has at least one value and every non-null value
/// is a plain number without leading zeros.
fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut seen = false;
    for cell in cells {
        if Value::from_raw(cell).is_null() {
            continue;
        }
        if !is_numeric_literal(cell.trim()) {
            return ColumnKind::Text;
        }
        seen = true;
    }
    if seen {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

fn is_numeric_literal(s: &str) -> bool {
    if !s.parse::<f64>().is_ok_and(|n| n.is_finite()) {
        return false;
    }
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return false;
    }
    let digits = s.trim_start_matches(['-', '+']);
    let bytes = digits.as_bytes();
    // 0123 keeps its zero padding as text
    !(bytes.len() > 1 && bytes[0] == b'0' && bytes[1].is_ascii_digit())
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(DatagateError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let variance =
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64;

        // Higher count with lower variance wins; tab breaks ties
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter_csv() {
        let data = b"a,b,c\n1,2,3\n4,5,6";
        assert_eq!(detect_delimiter(data).unwrap(), b',');
    }

    #[test]
    fn test_detect_delimiter_tsv() {
        let data = b"a\tb\tc\n1\t2\t3\n4\t5\t6";
        assert_eq!(detect_delimiter(data).unwrap(), b'\t');
    }

    #[test]
    fn test_detect_delimiter_ignores_quoted() {
        let data = b"name;city\n\"Doe, John\";Recife\n\"Roe, Jane\";Natal";
        assert_eq!(detect_delimiter(data).unwrap(), b';');
    }

    #[test]
    fn test_parse_csv() {
        let loader = Loader::new();
        let data = b"name,age,city\nAlice,30,NYC\nBob,25,LA";
        let table = loader.parse_bytes(data).unwrap();

        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "city"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(0, 0), Some(&Value::Text("Alice".to_string())));
        assert_eq!(table.get(1, 1), Some(&Value::Number(25.0)));
        assert_eq!(table.column("age").unwrap().kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_ragged_rows_padded() {
        let loader = Loader::new();
        let table = loader.parse_bytes(b"a,b,c\n1,2\n4,5,6,7").unwrap();
        assert_eq!(table.rows()[0].values.len(), 3);
        assert!(table.rows()[0].values[2].is_null());
        assert_eq!(table.rows()[1].values.len(), 3);
    }

    #[test]
    fn test_leading_zeros_stay_text() {
        let loader = Loader::new();
        let table = loader.parse_bytes(b"code,n\n0123,1\n0456,2").unwrap();
        assert_eq!(table.column("code").unwrap().kind, ColumnKind::Text);
        assert_eq!(table.column("n").unwrap().kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_kind_override() {
        let mut overrides = HashMap::new();
        overrides.insert("id".to_string(), ColumnKind::Text);
        overrides.insert("lat".to_string(), ColumnKind::Numeric);
        let loader = Loader::with_config(LoaderConfig::default().with_kind_overrides(overrides));

        let table = loader.parse_bytes(b"id;lat\n1;-23,5\n2;abc").unwrap();
        assert_eq!(table.column("id").unwrap().kind, ColumnKind::Text);
        assert_eq!(table.get(0, 1), Some(&Value::Number(-23.5)));
        assert_eq!(table.get(1, 1), Some(&Value::Text("abc".to_string())));
    }

    #[test]
    fn test_all_null_column_is_text() {
        let loader = Loader::new();
        let table = loader.parse_bytes(b"a,b\n1,\n2,NA").unwrap();
        assert_eq!(table.column("b").unwrap().kind, ColumnKind::Text);
    }

    #[test]
    fn test_header_only_is_empty() {
        let loader = Loader::new();
        let err = loader.parse_bytes(b"a,b,c\n").unwrap_err();
        assert!(matches!(err, DatagateError::EmptyData(_)));
    }

    #[test]
    fn test_spreadsheet_rejected() {
        let loader = Loader::new();
        let err = loader.load("data/antivenom.xlsx").unwrap_err();
        assert!(matches!(err, DatagateError::UnsupportedFormat(_)));
    }
}
