use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::dataset::{DataTable, Value};
use crate::error::CheckError;
use crate::manifest::Manifest;
use crate::stats::compress_ranges_limited;
use crate::validation::{Finding, Severity, Validator};

const NAME: &str = "parsing";

/// Characters that usually arrive from spreadsheet copy/paste.
const SPECIAL_CHARS: &[(char, &str)] = &[
    ('\u{2013}', "en dash"),
    ('\u{2014}', "em dash"),
    ('\u{00a0}', "non-breaking space"),
    ('\t', "tab"),
    ('\u{200b}', "zero-width space"),
];

/// Flags text cells that will not survive naive string comparison.
pub struct ParsingValidator;

impl Validator for ParsingValidator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();

        for (col, column) in table.columns().iter().enumerate() {
            let mut padded_rows = BTreeSet::new();
            let mut padded_examples = Vec::new();
            let mut special_rows = BTreeSet::new();
            let mut special_counts: IndexMap<&str, usize> = IndexMap::new();

            for (row, value) in table.values(col) {
                let Value::Text(text) = value else {
                    continue;
                };

                if text.trim() != text {
                    padded_rows.insert(row);
                    if padded_examples.len() < 5 {
                        padded_examples.push(format!("row {}: {:?}", row, text));
                    }
                }

                for (ch, label) in SPECIAL_CHARS {
                    let n = text.matches(*ch).count();
                    if n > 0 {
                        *special_counts.entry(*label).or_default() += n;
                        special_rows.insert(row);
                    }
                }
            }

            if !padded_rows.is_empty() {
                findings.push(
                    Finding::new(
                        NAME,
                        Severity::Minor,
                        format!(
                            "column '{}': {} cells with leading/trailing whitespace (rows {})",
                            column.name,
                            padded_rows.len(),
                            compress_ranges_limited(&padded_rows, 20)
                        ),
                    )
                    .with_rows(padded_rows)
                    .with_evidence(padded_examples),
                );
            }

            if !special_counts.is_empty() {
                let total: usize = special_counts.values().sum();
                findings.push(
                    Finding::new(
                        NAME,
                        Severity::Info,
                        format!(
                            "column '{}': {} special characters in {} cells",
                            column.name,
                            total,
                            special_rows.len()
                        ),
                    )
                    .with_rows(special_rows)
                    .with_evidence(
                        special_counts
                            .iter()
                            .map(|(label, n)| format!("{}: {}", label, n)),
                    ),
                );
            }
        }

        if let Some(geo) = &manifest.geospatial {
            for name in [&geo.lat_column, &geo.lon_column] {
                let Some(col) = table.column_index(name) else {
                    continue;
                };
                let bad: Vec<(usize, &Value)> = table
                    .values(col)
                    .filter(|(_, v)| !v.is_null() && v.as_f64().is_none())
                    .collect();
                if bad.is_empty() {
                    continue;
                }
                findings.push(
                    Finding::new(
                        NAME,
                        Severity::Major,
                        format!("non-numeric values in coordinate column '{}' ({} rows)", name, bad.len()),
                    )
                    .with_rows(bad.iter().map(|(row, _)| *row))
                    .with_evidence(bad.iter().map(|(row, v)| {
                        format!("row {}: {:?}", row, v.render().unwrap_or_default())
                    })),
                );
            }
        }

        Ok(findings)
    }
}
