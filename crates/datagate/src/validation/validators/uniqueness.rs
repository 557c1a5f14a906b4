use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::{not_configured, require_column};
use crate::dataset::DataTable;
use crate::error::CheckError;
use crate::manifest::Manifest;
use crate::validation::{Finding, Severity, Validator};

const NAME: &str = "uniqueness";

/// Characters removed from keys before comparison.
const INVISIBLE_CHARS: &[char] = &['\u{200b}', '\u{200c}', '\u{200d}', '\u{feff}'];

/// Primary-key duplicate detection.
pub struct UniquenessValidator;

/// A normalized key seen on more than one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCluster {
    pub key: String,
    pub occurrence_count: usize,
    pub rows: Vec<usize>,
}

/// Trim and strip invisible characters.
fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Duplicate clusters of a column, largest first; ties keep first-appearance order.
pub fn duplicate_clusters(table: &DataTable, col: usize) -> Vec<DuplicateCluster> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (row, value) in table.values(col) {
        let Some(raw) = value.render() else {
            continue;
        };
        let key = normalize_key(&raw);
        if key.is_empty() {
            continue;
        }
        groups.entry(key).or_default().push(row);
    }

    let mut clusters: Vec<DuplicateCluster> = groups
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(key, rows)| DuplicateCluster {
            key,
            occurrence_count: rows.len(),
            rows,
        })
        .collect();
    // Stable sort keeps first-appearance order among equal counts
    clusters.sort_by(|a, b| b.occurrence_count.cmp(&a.occurrence_count));
    clusters
}

impl Validator for UniquenessValidator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError> {
        let Some(config) = &manifest.uniqueness else {
            return Ok(vec![not_configured(NAME, "uniqueness")]);
        };
        let key = &config.primary_key;
        let col = require_column(table, "uniqueness", key)?;

        let non_null = table.values(col).filter(|(_, v)| !v.is_null()).count();
        if non_null == 0 {
            return Ok(vec![Finding::new(
                NAME,
                Severity::Info,
                format!("key column '{}' is entirely null", key),
            )]);
        }

        let clusters = duplicate_clusters(table, col);
        if clusters.is_empty() {
            return Ok(vec![Finding::new(
                NAME,
                Severity::Info,
                format!("all {} non-null values of '{}' are unique", non_null, key),
            )]);
        }

        let rows: BTreeSet<usize> = clusters.iter().flat_map(|c| c.rows.iter().copied()).collect();
        let top: Vec<String> = clusters
            .iter()
            .take(config.top_n)
            .map(|c| format!("{}: {} occurrences", c.key, c.occurrence_count))
            .collect();

        Ok(vec![
            Finding::new(
                NAME,
                Severity::Major,
                format!(
                    "column '{}': {} duplicated rows across {} distinct keys; top: {}",
                    key,
                    rows.len(),
                    clusters.len(),
                    top.join(", ")
                ),
            )
            .with_rows(rows)
            .with_evidence(top),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest::from_yaml_str("uniqueness:\n  primary_key: CNES\n").unwrap()
    }

    #[test]
    fn test_duplicate_clusters() {
        let table = DataTable::from_strings(
            &["CNES"],
            &[vec!["A"], vec!["A"], vec!["B"], vec!["C"], vec!["C"], vec!["C"]],
        );

        let clusters = duplicate_clusters(&table, 0);
        let summary: Vec<(&str, usize)> = clusters
            .iter()
            .map(|c| (c.key.as_str(), c.occurrence_count))
            .collect();
        assert_eq!(summary, vec![("C", 3), ("A", 2)]);

        let findings = UniquenessValidator.validate(&table, &manifest()).unwrap();
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.severity, Severity::Major);
        assert_eq!(f.affected_rows.len(), 5);
        assert!(f.message.contains("5 duplicated rows across 2 distinct keys"));
        assert_eq!(f.evidence, vec!["C: 3 occurrences", "A: 2 occurrences"]);
    }

    #[test]
    fn test_normalization() {
        let table = DataTable::from_strings(
            &["CNES"],
            &[vec!["2077485"], vec![" 2077485\u{200b}"], vec!["\u{feff}2077485 "]],
        );
        let clusters = duplicate_clusters(&table, 0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].rows, vec![1, 2, 3]);
    }

    #[test]
    fn test_ties_keep_first_appearance() {
        let table = DataTable::from_strings(
            &["CNES"],
            &[vec!["B"], vec!["A"], vec!["A"], vec!["B"]],
        );
        let keys: Vec<String> = duplicate_clusters(&table, 0).into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["B", "A"]);
    }

    #[test]
    fn test_unique_and_all_null() {
        let unique = DataTable::from_strings(&["CNES"], &[vec!["1"], vec!["2"]]);
        let findings = UniquenessValidator.validate(&unique, &manifest()).unwrap();
        assert_eq!(findings[0].severity, Severity::Info);
        assert!(findings[0].message.contains("unique"));

        let empty = DataTable::from_strings(&["CNES"], &[vec![""], vec!["NA"]]);
        let findings = UniquenessValidator.validate(&empty, &manifest()).unwrap();
        assert!(findings[0].message.contains("entirely null"));
    }
}
