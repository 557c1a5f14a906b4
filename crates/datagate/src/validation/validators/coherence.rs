use std::borrow::Cow;
use std::collections::BTreeSet;

use indexmap::IndexSet;

use super::{not_configured, require_column};
use crate::dataset::DataTable;
use crate::error::CheckError;
use crate::manifest::{Manifest, MembershipRule, NullPolicy, ParityRule, UnknownKey};
use crate::stats::{compress_ranges_limited, percentage};
use crate::validation::{Finding, MAX_EVIDENCE, Severity, Validator};

const NAME: &str = "coherence";

/// Cross-column relations: membership tables and list-length parity.
pub struct CoherenceValidator;

impl Validator for CoherenceValidator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError> {
        let Some(config) = &manifest.coherence else {
            return Ok(vec![not_configured(NAME, "coherence")]);
        };

        let mut findings = Vec::new();
        for rule in &config.membership {
            findings.extend(check_membership(table, rule, config.null_policy)?);
        }
        for rule in &config.parity {
            findings.extend(check_parity(table, rule, config.null_policy)?);
        }
        Ok(findings)
    }
}

/// A row where both sides of a relation have a value.
struct Pair<'a> {
    row: usize,
    a: Cow<'a, str>,
    b: Cow<'a, str>,
}

/// Rows of a relation, split by null handling.
struct Pairs<'a> {
    complete: Vec<Pair<'a>>,
    /// One side null, flagged under [`NullPolicy::Flag`].
    flagged: BTreeSet<usize>,
    /// Not compared: both sides null, or one side null under [`NullPolicy::Exclude`].
    excluded: BTreeSet<usize>,
}

fn collect_pairs<'a>(
    table: &'a DataTable,
    column_a: &str,
    column_b: &str,
    policy: NullPolicy,
) -> Result<Pairs<'a>, CheckError> {
    let col_a = require_column(table, "coherence", column_a)?;
    let col_b = require_column(table, "coherence", column_b)?;

    let mut pairs = Pairs {
        complete: Vec::new(),
        flagged: BTreeSet::new(),
        excluded: BTreeSet::new(),
    };

    for row in table.rows() {
        match (row.values[col_a].render(), row.values[col_b].render()) {
            (Some(a), Some(b)) => pairs.complete.push(Pair {
                row: row.index,
                a,
                b,
            }),
            (None, None) => {
                pairs.excluded.insert(row.index);
            }
            _ => match policy {
                NullPolicy::Exclude => {
                    pairs.excluded.insert(row.index);
                }
                NullPolicy::Flag => {
                    pairs.flagged.insert(row.index);
                }
            },
        }
    }

    Ok(pairs)
}

fn excluded_note(label: &str, excluded: &BTreeSet<usize>) -> Option<Finding> {
    if excluded.is_empty() {
        return None;
    }
    Some(
        Finding::new(
            NAME,
            Severity::Info,
            format!("{}: {} rows not compared because of null values", label, excluded.len()),
        )
        .with_rows(excluded.iter().copied()),
    )
}

fn check_membership(
    table: &DataTable,
    rule: &MembershipRule,
    policy: NullPolicy,
) -> Result<Vec<Finding>, CheckError> {
    let pairs = collect_pairs(table, &rule.column_a, &rule.column_b, policy)?;
    let label = format!("membership '{}'", rule.name);

    let mut violations = BTreeSet::new();
    let mut examples = Vec::new();
    let mut unknown_rows = BTreeSet::new();
    let mut unknown_keys: IndexSet<&str> = IndexSet::new();

    for pair in &pairs.complete {
        let (a, b) = (pair.a.trim(), pair.b.trim());
        let Some(allowed) = rule.table.get(a) else {
            match rule.unknown_key {
                UnknownKey::Note => {
                    unknown_rows.insert(pair.row);
                    unknown_keys.insert(a);
                }
                UnknownKey::Mismatch => {
                    violations.insert(pair.row);
                    if examples.len() < MAX_EVIDENCE {
                        examples.push(format!(
                            "{}={} but {}={} (expected no {} outside the table)",
                            rule.column_a, a, rule.column_b, b, rule.column_a
                        ));
                    }
                }
            }
            continue;
        };
        if !allowed.iter().any(|v| v == b) {
            violations.insert(pair.row);
            if examples.len() < MAX_EVIDENCE {
                examples.push(format!(
                    "{}={} but {}={} (expected {})",
                    rule.column_a,
                    a,
                    rule.column_b,
                    b,
                    allowed.join(" or ")
                ));
            }
        }
    }

    let mut findings = Vec::new();
    if !violations.is_empty() || !pairs.flagged.is_empty() {
        let mut message = format!(
            "{}: {} rows where {} does not match {}",
            label,
            violations.len(),
            rule.column_b,
            rule.column_a
        );
        if !pairs.flagged.is_empty() {
            message.push_str(&format!(", {} rows with one side null", pairs.flagged.len()));
        }
        let null_examples = pairs
            .flagged
            .iter()
            .map(|row| format!("row {}: one of {}/{} is null", row, rule.column_a, rule.column_b));
        findings.push(
            Finding::new(NAME, rule.severity, message)
                .with_rows(violations.union(&pairs.flagged).copied())
                .with_evidence(examples.into_iter().chain(null_examples)),
        );
    }

    if !unknown_rows.is_empty() {
        findings.push(
            Finding::new(
                NAME,
                Severity::Info,
                format!(
                    "{}: {} rows with a {} value missing from the table",
                    label,
                    unknown_rows.len(),
                    rule.column_a
                ),
            )
            .with_rows(unknown_rows)
            .with_evidence(unknown_keys.iter().copied()),
        );
    }

    findings.extend(excluded_note(&label, &pairs.excluded));
    Ok(findings)
}

/// Number of non-empty items after splitting and trimming.
fn item_count(value: &str, separator: &str) -> usize {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .count()
}

fn check_parity(
    table: &DataTable,
    rule: &ParityRule,
    policy: NullPolicy,
) -> Result<Vec<Finding>, CheckError> {
    let pairs = collect_pairs(table, &rule.column_a, &rule.column_b, policy)?;
    let label = format!("parity '{}'", rule.name);

    let mut diverging = BTreeSet::new();
    let mut examples = Vec::new();
    for pair in &pairs.complete {
        let count_a = item_count(&pair.a, &rule.separator);
        let count_b = item_count(&pair.b, &rule.separator);
        if count_a != count_b {
            diverging.insert(pair.row);
            if examples.len() < MAX_EVIDENCE {
                examples.push(format!(
                    "row {}: {} items in {} vs {} in {}",
                    pair.row, count_a, rule.column_a, count_b, rule.column_b
                ));
            }
        }
    }

    let mut findings = Vec::new();
    let affected: BTreeSet<usize> = diverging.union(&pairs.flagged).copied().collect();
    if !affected.is_empty() {
        findings.push(
            Finding::new(
                NAME,
                rule.severity,
                format!(
                    "{}: {} rows ({:.1}% of dataset) where {} and {} have different item counts (rows {})",
                    label,
                    affected.len(),
                    percentage(affected.len(), table.row_count()),
                    rule.column_a,
                    rule.column_b,
                    compress_ranges_limited(&affected, 20)
                ),
            )
            .with_rows(affected)
            .with_evidence(examples),
        );
    }

    findings.extend(excluded_note(&label, &pairs.excluded));
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
coherence:
  membership:
    - name: fu_state
      column_a: FU
      column_b: State
      table:
        SP: [São Paulo]
        ES: [Espírito Santo, Espiríto Santo]
    - name: region_fu
      column_a: FU
      column_b: Region
      invert: true
      table:
        Sudeste: [SP, ES]
  parity:
    - name: antivenoms
      column_a: Services
      column_b: Counts
"#;

    fn table() -> DataTable {
        DataTable::from_strings(
            &["FU", "State", "Region", "Services", "Counts"],
            &[
                vec!["SP", "São Paulo", "Sudeste", "a, b", "1, 2"],
                vec!["SP", "Bahia", "Nordeste", "a, b", "1, 2, 3"],
                vec!["ES", "Espiríto Santo", "Sudeste", "", ""],
                vec!["XX", "Nowhere", "Sudeste", "a", ""],
                vec!["", "Bahia", "Sudeste", "a,,b", "1,2"],
            ],
        )
    }

    #[test]
    fn test_membership_violations() {
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();
        let findings = CoherenceValidator.validate(&table(), &manifest).unwrap();

        let state = &findings[0];
        assert_eq!(state.severity, Severity::Major);
        assert_eq!(state.affected_rows, BTreeSet::from([2]));
        assert_eq!(state.evidence, vec!["FU=SP but State=Bahia (expected São Paulo)"]);

        let unknown = &findings[1];
        assert_eq!(unknown.severity, Severity::Info);
        assert_eq!(unknown.affected_rows, BTreeSet::from([4]));

        let excluded = &findings[2];
        assert_eq!(excluded.severity, Severity::Info);
        assert_eq!(excluded.affected_rows, BTreeSet::from([5]));

        let region = &findings[3];
        assert_eq!(region.severity, Severity::Major);
        assert_eq!(region.affected_rows, BTreeSet::from([2]));
        assert!(region.evidence[0].contains("(expected Sudeste)"));
    }

    #[test]
    fn test_unknown_key_as_mismatch() {
        let yaml = MANIFEST.replace(
            "      column_b: State\n",
            "      column_b: State\n      unknown_key: mismatch\n",
        );
        let manifest = Manifest::from_yaml_str(&yaml).unwrap();
        let findings = CoherenceValidator.validate(&table(), &manifest).unwrap();

        let state = &findings[0];
        assert_eq!(state.severity, Severity::Major);
        assert_eq!(state.affected_rows, BTreeSet::from([2, 4]));
        assert!(state.message.contains("2 rows where State does not match FU"));
        assert_eq!(state.evidence[1], "FU=XX but State=Nowhere (expected no FU outside the table)");
        assert!(!findings[1].message.contains("missing from the table"));
    }

    #[test]
    fn test_unknown_key_as_note() {
        let table = DataTable::from_strings(
            &["FU", "State", "Region", "Services", "Counts"],
            &[
                vec!["SP", "São Paulo", "Sudeste", "a", "1"],
                vec!["XX", "Bahia", "Sudeste", "a", "1"],
            ],
        );
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();
        let findings = CoherenceValidator.validate(&table, &manifest).unwrap();

        let unknown = findings
            .iter()
            .find(|f| f.message.starts_with("membership 'fu_state'"))
            .unwrap();
        assert_eq!(unknown.severity, Severity::Info);
        assert_eq!(unknown.affected_rows, BTreeSet::from([2]));
        assert_eq!(unknown.evidence, vec!["XX"]);
    }

    #[test]
    fn test_parity_excludes_nulls() {
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();
        let findings = CoherenceValidator.validate(&table(), &manifest).unwrap();

        let parity: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.message.starts_with("parity"))
            .collect();
        assert_eq!(parity.len(), 2);
        assert_eq!(parity[0].severity, Severity::Minor);
        // 2 items vs 3 items; "a,,b" drops the empty item so row 5 agrees
        assert_eq!(parity[0].affected_rows, BTreeSet::from([2]));
        assert!(parity[0].message.contains("20.0% of dataset"));
        assert_eq!(parity[1].affected_rows, BTreeSet::from([3, 4]));
    }

    #[test]
    fn test_flag_policy_counts_one_sided_nulls() {
        let yaml = MANIFEST.replace("coherence:\n", "coherence:\n  null_policy: flag\n");
        let manifest = Manifest::from_yaml_str(&yaml).unwrap();
        let findings = CoherenceValidator.validate(&table(), &manifest).unwrap();

        let parity = findings
            .iter()
            .find(|f| f.message.starts_with("parity") && f.severity == Severity::Minor)
            .unwrap();
        // Row 4 has one side null, row 3 has both sides null
        assert_eq!(parity.affected_rows, BTreeSet::from([2, 4]));
    }

    #[test]
    fn test_item_count() {
        assert_eq!(item_count("a, b ,c", ","), 3);
        assert_eq!(item_count("a,,b,", ","), 2);
        assert_eq!(item_count("single", ","), 1);
    }

    #[test]
    fn test_missing_relation_column() {
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();
        let table = DataTable::from_strings(&["FU"], &[vec!["SP"]]);
        assert!(CoherenceValidator.validate(&table, &manifest).is_err());
    }
}
