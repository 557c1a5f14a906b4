use sha2::{Digest, Sha256};

use crate::dataset::{DataTable, Value};
use crate::error::CheckError;
use crate::manifest::Manifest;
use crate::validation::{Finding, Severity, Validator};

const NAME: &str = "reproducibility";

/// Row count drift beyond this is MAJOR.
const ROW_DRIFT_MAJOR: usize = 10;

/// Content hash regression gate and dataset fingerprint.
pub struct ReproducibilityValidator;

/// Append a length-prefixed cell so that no two cell sequences share an encoding.
fn encode_cell(out: &mut Vec<u8>, value: &Value) {
    match value.render() {
        None => out.push(b'N'),
        Some(text) => {
            out.push(match value {
                Value::Number(_) => b'F',
                _ => b'T',
            });
            out.extend_from_slice(&(text.len() as u64).to_le_bytes());
            out.extend_from_slice(text.as_bytes());
        }
    }
}

/// SHA-256 over the canonical content of a table, as `sha256:<hex>`.
///
/// Columns are taken in name order and rows in encoded order, so the hash
/// depends on what the table holds, not on how the source file laid it out.
pub fn content_hash(table: &DataTable) -> String {
    let mut order: Vec<usize> = (0..table.column_count()).collect();
    order.sort_by(|&a, &b| table.columns()[a].name.cmp(&table.columns()[b].name));

    let mut header = Vec::new();
    for &col in &order {
        let column = &table.columns()[col];
        encode_cell(&mut header, &Value::Text(column.name.clone()));
        header.extend_from_slice(column.kind.label().as_bytes());
    }

    let mut rows: Vec<Vec<u8>> = table
        .rows()
        .iter()
        .map(|row| {
            let mut encoded = Vec::new();
            for &col in &order {
                encode_cell(&mut encoded, &row.values[col]);
            }
            encoded
        })
        .collect();
    rows.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update((header.len() as u64).to_le_bytes());
    hasher.update(&header);
    for row in &rows {
        hasher.update((row.len() as u64).to_le_bytes());
        hasher.update(row);
    }
    format!("sha256:{:x}", hasher.finalize())
}

/// Compare digests ignoring case and the `sha256:` prefix.
fn same_hash(a: &str, b: &str) -> bool {
    let strip = |s: &str| s.trim().trim_start_matches("sha256:").to_ascii_lowercase();
    strip(a) == strip(b)
}

fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

impl Validator for ReproducibilityValidator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError> {
        let hash = content_hash(table);
        let expected = &manifest.reproducibility;
        let mut findings = Vec::new();

        match &expected.expected_hash {
            Some(want) if !same_hash(want, &hash) => findings.push(
                Finding::new(
                    NAME,
                    Severity::Blocker,
                    format!("content hash mismatch: expected {}, got {}", want, hash),
                )
                .with_evidence([format!("expected: {}", want), format!("actual: {}", hash)]),
            ),
            Some(_) => findings.push(Finding::new(
                NAME,
                Severity::Info,
                format!("content hash matches the expected value: {}", hash),
            )),
            None => findings.push(Finding::new(
                NAME,
                Severity::Info,
                format!("content hash: {}", hash),
            )),
        }

        findings.push(Finding::new(
            NAME,
            Severity::Info,
            format!(
                "{} rows x {} columns, {} estimated",
                table.row_count(),
                table.column_count(),
                format_bytes(table.memory_estimate())
            ),
        ));

        if let Some(want) = expected.expected_rows {
            let actual = table.row_count();
            if actual != want {
                let drift = actual.abs_diff(want);
                let severity = if drift > ROW_DRIFT_MAJOR {
                    Severity::Major
                } else {
                    Severity::Minor
                };
                findings.push(Finding::new(
                    NAME,
                    severity,
                    format!(
                        "row count {} differs from expected {} ({}{})",
                        actual,
                        want,
                        if actual > want { "+" } else { "-" },
                        drift
                    ),
                ));
            }
        }

        for (col, column) in table.columns().iter().enumerate() {
            findings.push(Finding::new(
                NAME,
                Severity::Info,
                format!(
                    "column '{}': {}, {}, {} nulls",
                    column.name,
                    column.kind.label(),
                    format_bytes(table.column_memory(col)),
                    table.column_null_count(col)
                ),
            ));
        }

        Ok(findings)
    }
}
