use std::collections::BTreeSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{not_configured, require_column};
use crate::dataset::DataTable;
use crate::error::CheckError;
use crate::manifest::{ConstraintFormat, ConstraintRule, Manifest, MissingnessRule};
use crate::stats::{compress_ranges, percentage};
use crate::validation::{Finding, MAX_EVIDENCE, Severity, Validator};

const NAME: &str = "constraints";

/// Parenthesized area code, 4-5 + 4 digits, optionally several numbers joined by `/` or `e`.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\(\d{2}\)\s?\d{4,5}[-.\s]?\d{4}(?:\s*(?:/|e)\s*(?:\(\d{2}\)\s?)?\d{4,5}[-.\s]?\d{4})*$",
    )
    .expect("phone pattern is valid")
});

/// Validates cell formats and per-column null ratios.
pub struct ConstraintsValidator;

impl Validator for ConstraintsValidator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError> {
        if manifest.constraints.is_empty() && manifest.missingness.is_empty() {
            return Ok(vec![not_configured(NAME, "constraints")]);
        }

        let mut findings = Vec::new();

        for (column, rule) in &manifest.constraints {
            let col = require_column(table, "constraints", column)?;
            findings.extend(check_format(table, col, column, rule));
        }

        for (column, rule) in &manifest.missingness {
            let col = require_column(table, "missingness", column)?;
            let is_key = manifest.identifier_column() == Some(column.as_str());
            findings.extend(check_missingness(table, col, column, rule, is_key));
        }

        Ok(findings)
    }
}

/// Outcome of matching one column against its rule.
#[derive(Default)]
struct FormatScan {
    invalid_rows: BTreeSet<usize>,
    invalid_examples: Vec<String>,
    allowed: IndexMap<String, usize>,
    allowed_rows: BTreeSet<usize>,
    empty_rows: BTreeSet<usize>,
}

fn scan(table: &DataTable, col: usize, rule: &ConstraintRule) -> FormatScan {
    let mut out = FormatScan::default();

    for (row, value) in table.values(col) {
        let Some(raw) = value.render() else {
            out.empty_rows.insert(row);
            continue;
        };
        let trimmed = raw.trim();

        if rule.allow_values.iter().any(|a| a == trimmed || a == raw.as_ref()) {
            *out.allowed.entry(trimmed.to_string()).or_default() += 1;
            out.allowed_rows.insert(row);
            continue;
        }

        let cleaned: String = trimmed
            .chars()
            .filter(|c| !rule.strip_chars.contains(*c))
            .collect();
        let valid = match &rule.format {
            ConstraintFormat::Pattern(re) => re.is_match(&cleaned),
            ConstraintFormat::Phone => PHONE_RE.is_match(&cleaned),
        };

        if !valid {
            out.invalid_rows.insert(row);
            let example = raw.to_string();
            if out.invalid_examples.len() < MAX_EVIDENCE && !out.invalid_examples.contains(&example)
            {
                out.invalid_examples.push(example);
            }
        }
    }

    out
}

fn check_format(table: &DataTable, col: usize, column: &str, rule: &ConstraintRule) -> Vec<Finding> {
    let scan = scan(table, col, rule);
    let mut findings = Vec::new();
    let total = table.row_count();

    if !scan.invalid_rows.is_empty() {
        let count = scan.invalid_rows.len();
        let pct = percentage(count, total);
        let finding = match &rule.format {
            ConstraintFormat::Pattern(re) => {
                let ratio = count as f64 / total as f64;
                let severity = if ratio > rule.max_invalid_ratio {
                    Severity::Major
                } else {
                    Severity::Minor
                };
                Finding::new(
                    NAME,
                    severity,
                    format!(
                        "column '{}': {} invalid values ({:.1}%) not matching {} at rows {}",
                        column,
                        count,
                        pct,
                        re.as_str(),
                        compress_ranges(&scan.invalid_rows)
                    ),
                )
            }
            ConstraintFormat::Phone => Finding::new(
                NAME,
                Severity::Minor,
                format!(
                    "column '{}': {} values ({:.1}%) do not look like phone numbers",
                    column, count, pct
                ),
            ),
        };
        findings.push(
            finding
                .with_rows(scan.invalid_rows)
                .with_evidence(scan.invalid_examples),
        );
    }

    if !scan.allowed.is_empty() {
        let count: usize = scan.allowed.values().sum();
        findings.push(
            Finding::new(
                NAME,
                Severity::Info,
                format!("column '{}': {} placeholder values accepted by the allow-list", column, count),
            )
            .with_rows(scan.allowed_rows)
            .with_evidence(scan.allowed.iter().map(|(v, n)| format!("{} ({}x)", v, n))),
        );
    }

    if matches!(rule.format, ConstraintFormat::Phone) && !scan.empty_rows.is_empty() {
        findings.push(
            Finding::new(
                NAME,
                Severity::Info,
                format!("column '{}': {} empty values", column, scan.empty_rows.len()),
            )
            .with_rows(scan.empty_rows),
        );
    }

    findings
}

fn check_missingness(
    table: &DataTable,
    col: usize,
    column: &str,
    rule: &MissingnessRule,
    is_key: bool,
) -> Option<Finding> {
    let total = table.row_count();
    if total == 0 {
        return None;
    }

    let null_rows: BTreeSet<usize> = table
        .values(col)
        .filter(|(_, v)| v.is_null())
        .map(|(row, _)| row)
        .collect();
    let ratio = null_rows.len() as f64 / total as f64;
    if ratio <= rule.max_null_ratio {
        return None;
    }

    let severity = rule.severity.unwrap_or(if is_key {
        Severity::Major
    } else {
        Severity::Minor
    });

    Some(
        Finding::new(
            NAME,
            severity,
            format!(
                "column '{}': {:.1}% null ({} of {} rows), limit {:.1}%",
                column,
                ratio * 100.0,
                null_rows.len(),
                total,
                rule.max_null_ratio * 100.0
            ),
        )
        .with_rows(null_rows),
    )
}
