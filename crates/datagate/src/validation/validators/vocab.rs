use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::{not_configured, require_column};
use crate::dataset::DataTable;
use crate::error::CheckError;
use crate::manifest::{Manifest, Vocabulary};
use crate::stats::{closest_match, percentage};
use crate::validation::{Finding, Validator};

const NAME: &str = "vocab";

/// Checks controlled-vocabulary columns and suggests the closest allowed value.
pub struct VocabValidator;

impl Validator for VocabValidator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError> {
        if manifest.vocabularies.is_empty() {
            return Ok(vec![not_configured(NAME, "vocabularies")]);
        }

        let mut findings = Vec::new();
        for (column, vocab) in &manifest.vocabularies {
            let col = require_column(table, "vocabularies", column)?;
            findings.extend(check_column(table, col, column, vocab));
        }
        Ok(findings)
    }
}

fn check_column(table: &DataTable, col: usize, column: &str, vocab: &Vocabulary) -> Option<Finding> {
    let mut rows = BTreeSet::new();
    // Distinct invalid values in first-seen order; None is a disallowed null
    let mut invalid: IndexMap<Option<String>, usize> = IndexMap::new();

    for (row, value) in table.values(col) {
        match value.render() {
            None if vocab.allow_null => {}
            None => {
                rows.insert(row);
                *invalid.entry(None).or_default() += 1;
            }
            Some(text) => {
                if !vocab.values.iter().any(|v| v == text.as_ref()) {
                    rows.insert(row);
                    *invalid.entry(Some(text.into_owned())).or_default() += 1;
                }
            }
        }
    }

    if rows.is_empty() {
        return None;
    }

    let evidence: Vec<String> = invalid
        .iter()
        .map(|(value, count)| match value {
            None => format!("null ({}x): nulls are not allowed", count),
            Some(value) => match closest_match(value, &vocab.values) {
                Some((suggestion, score)) => format!(
                    "{:?} ({}x): did you mean {:?}? ({:.0}% similar)",
                    value,
                    count,
                    suggestion,
                    score * 100.0
                ),
                None => format!("{:?} ({}x)", value, count),
            },
        })
        .collect();

    Some(
        Finding::new(
            NAME,
            vocab.severity,
            format!(
                "column '{}': {} values ({:.1}%) outside the controlled vocabulary, {} distinct",
                column,
                rows.len(),
                percentage(rows.len(), table.row_count()),
                invalid.len()
            ),
        )
        .with_rows(rows)
        .with_evidence(evidence),
    )
}
