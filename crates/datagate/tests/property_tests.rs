//! Property-based tests for datagate.
//!
//! These tests use proptest to generate random inputs and verify that the
//! aggregation contract and the numeric helpers hold under all conditions.
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p datagate --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p datagate --test property_tests
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use proptest::prelude::*;

use datagate::report::{DatasetStats, GlobalStatus, aggregate};
use datagate::stats::{compress_ranges, iqr_outliers, levenshtein, quartiles, similarity};
use datagate::validation::validators::content_hash;
use datagate::{CheckResult, DataTable, Finding, Severity};

// =============================================================================
// Test Strategies
// =============================================================================

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Minor),
        Just(Severity::Major),
        Just(Severity::Blocker),
    ]
}

/// Nine checks, each with an arbitrary list of finding severities.
fn battery() -> impl Strategy<Value = Vec<Vec<Severity>>> {
    prop::collection::vec(prop::collection::vec(severity(), 0..6), 9)
}

fn stats() -> DatasetStats {
    DatasetStats {
        row_count: 0,
        column_count: 0,
        null_cell_count: 0,
        null_ratio: 0.0,
        memory_estimate: 0,
        content_hash: String::new(),
    }
}

fn build(battery: &[Vec<Severity>]) -> Vec<CheckResult> {
    battery
        .iter()
        .enumerate()
        .map(|(i, severities)| {
            let name = format!("check{}", i);
            let findings = severities
                .iter()
                .map(|s| Finding::new(name.clone(), *s, "generated"))
                .collect();
            CheckResult::new(name, findings, Duration::ZERO)
        })
        .collect()
}

// =============================================================================
// Aggregation Properties
// =============================================================================

proptest! {
    #[test]
    fn check_passes_iff_all_info(severities in prop::collection::vec(severity(), 0..10)) {
        let check = &build(&[severities.clone()])[0];
        prop_assert_eq!(check.passed, severities.iter().all(|s| *s == Severity::Info));
    }

    #[test]
    fn global_status_matches_failed_checks(battery in battery()) {
        let report = aggregate(stats(), build(&battery));
        let any_failed = report.checks.iter().any(|c| !c.passed);

        prop_assert_eq!(report.global_status == GlobalStatus::Fail, any_failed);
        prop_assert_eq!(
            report.counts.checks_failed,
            report.checks.iter().filter(|c| !c.passed).count()
        );
        prop_assert_eq!(report.counts.checks_passed + report.counts.checks_failed, 9);
    }

    #[test]
    fn finding_counts_are_consistent(battery in battery()) {
        let report = aggregate(stats(), build(&battery));
        let all: Vec<Severity> = battery.iter().flatten().copied().collect();

        let count = |s: Severity| all.iter().filter(|x| **x == s).count();
        prop_assert_eq!(report.counts.infos, count(Severity::Info));
        prop_assert_eq!(report.counts.warnings, count(Severity::Minor));
        prop_assert_eq!(
            report.counts.errors,
            count(Severity::Major) + count(Severity::Blocker)
        );
        for severity in Severity::ALL {
            prop_assert_eq!(report.severity_counts[&severity], count(severity));
        }
    }
}

// =============================================================================
// Numeric Helpers
// =============================================================================

proptest! {
    #[test]
    fn similarity_is_bounded_and_symmetric(a in "[a-zA-Z ]{0,20}", b in "[a-zA-Z ]{0,20}") {
        let s = similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&s));
        prop_assert!((s - similarity(&b, &a)).abs() < 1e-12);
        prop_assert_eq!(similarity(&a, &a), 1.0);
    }

    #[test]
    fn levenshtein_bounded_by_longer_string(a in "[a-z]{0,15}", b in "[a-z]{0,15}") {
        let d = levenshtein(&a, &b);
        prop_assert!(d <= a.chars().count().max(b.chars().count()));
        prop_assert_eq!(d == 0, a == b);
    }

    #[test]
    fn iqr_outliers_lie_outside_the_fences(
        values in prop::collection::vec(-1000.0f64..1000.0, 0..60),
        k in 0.5f64..3.0,
    ) {
        let outliers = iqr_outliers(&values, k);
        prop_assert!(outliers.len() < values.len().max(1));

        if let Some((q1, q3)) = quartiles(&values) {
            let (lower, upper) = (q1 - k * (q3 - q1), q3 + k * (q3 - q1));
            for (i, v) in values.iter().enumerate() {
                prop_assert_eq!(outliers.contains(&i), *v < lower || *v > upper);
            }
        }
    }

    #[test]
    fn compress_ranges_covers_every_row(rows in prop::collection::btree_set(1usize..200, 0..40)) {
        let text = compress_ranges(&rows);
        let mut expanded = BTreeSet::new();
        for part in text.split(", ").filter(|p| !p.is_empty()) {
            match part.split_once('-') {
                Some((lo, hi)) => {
                    let (lo, hi): (usize, usize) = (lo.parse().unwrap(), hi.parse().unwrap());
                    expanded.extend(lo..=hi);
                }
                None => {
                    expanded.insert(part.parse::<usize>().unwrap());
                }
            }
        }
        prop_assert_eq!(expanded, rows);
    }
}

// =============================================================================
// Content Hash
// =============================================================================

proptest! {
    #[test]
    fn content_hash_ignores_row_order(
        rows in prop::collection::vec(("[a-z0-9]{0,6}", "[a-z0-9]{0,6}"), 1..15)
    ) {
        let forward: Vec<Vec<&str>> = rows.iter().map(|(a, b)| vec![a.as_str(), b.as_str()]).collect();
        let mut backward = forward.clone();
        backward.reverse();

        let a = DataTable::from_strings(&["x", "y"], &forward);
        let b = DataTable::from_strings(&["x", "y"], &backward);
        prop_assert_eq!(content_hash(&a), content_hash(&b));
    }
}
