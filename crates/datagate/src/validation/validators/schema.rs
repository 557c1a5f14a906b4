use std::collections::HashSet;

use super::not_configured;
use crate::dataset::{ColumnKind, DataTable, Value};
use crate::error::CheckError;
use crate::manifest::{ExpectedColumn, Manifest};
use crate::validation::{Finding, Severity, Validator};

const NAME: &str = "schema";

/// Compares dataset headers with the manifest's expected columns.
pub struct SchemaValidator;

impl Validator for SchemaValidator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError> {
        if manifest.columns.is_empty() {
            return Ok(vec![not_configured(NAME, "columns")]);
        }

        let mut findings = Vec::new();
        let mut documented: HashSet<&str> = HashSet::new();

        for expected in &manifest.columns {
            documented.insert(&expected.name);

            if table.column_index(&expected.name).is_some() {
                findings.extend(kind_mismatch(table, expected, &expected.name));
                continue;
            }

            let alias = expected
                .aliases
                .iter()
                .find(|a| table.column_index(a).is_some());
            if let Some(alias) = alias {
                documented.insert(alias);
                findings.push(Finding::new(
                    NAME,
                    Severity::Info,
                    format!("column '{}' found under alias '{}'", expected.name, alias),
                ));
                findings.extend(kind_mismatch(table, expected, alias));
                continue;
            }

            if expected.required {
                let mut finding = Finding::new(
                    NAME,
                    Severity::Blocker,
                    format!("missing required column '{}'", expected.name),
                );
                if !expected.aliases.is_empty() {
                    finding = finding
                        .with_evidence([format!("aliases tried: {}", expected.aliases.join(", "))]);
                }
                findings.push(finding);
            } else {
                findings.push(Finding::new(
                    NAME,
                    Severity::Info,
                    format!("optional column '{}' is absent", expected.name),
                ));
            }
        }

        for column in table.columns() {
            if !documented.contains(column.name.as_str()) {
                findings.push(Finding::new(
                    NAME,
                    Severity::Info,
                    format!("undocumented column '{}'", column.name),
                ));
            }
        }

        Ok(findings)
    }
}

/// MINOR finding when a column declared numeric holds non-numeric cells.
fn kind_mismatch(table: &DataTable, expected: &ExpectedColumn, actual_name: &str) -> Option<Finding> {
    let declared = expected.kind?;
    let col = table.column_index(actual_name)?;

    match declared {
        ColumnKind::Numeric => {
            let bad: Vec<(usize, &str)> = table
                .values(col)
                .filter_map(|(row, v)| match v {
                    Value::Text(s) if v.as_f64().is_none() => Some((row, s.as_str())),
                    _ => None,
                })
                .collect();
            if bad.is_empty() {
                return None;
            }
            Some(
                Finding::new(
                    NAME,
                    Severity::Minor,
                    format!(
                        "column '{}' is declared numeric but has {} non-numeric values",
                        actual_name,
                        bad.len()
                    ),
                )
                .with_rows(bad.iter().map(|(row, _)| *row))
                .with_evidence(bad.iter().map(|(row, s)| format!("row {}: {:?}", row, s))),
            )
        }
        // Declared text columns are loaded as text by the kind overrides
        ColumnKind::Text => None,
    }
}
