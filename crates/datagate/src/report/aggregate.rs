//! Reduction of completed check results into a [`Report`].

use std::collections::BTreeMap;

use super::model::{Counts, DatasetStats, GlobalStatus, Report};
use crate::validation::{CheckResult, Severity};

/// Collects check results into fixed slots and builds the report once all are in.
///
/// Slots are keyed by the check's canonical position, so completion order
/// never affects the order of `Report::checks`.
#[derive(Debug)]
pub struct ResultAggregator {
    slots: Vec<Option<CheckResult>>,
}

impl ResultAggregator {
    /// Create an aggregator expecting `expected` results.
    pub fn new(expected: usize) -> Self {
        Self {
            slots: vec![None; expected],
        }
    }

    /// Store the result of the check at `position`.
    pub fn insert(&mut self, position: usize, result: CheckResult) {
        if let Some(slot) = self.slots.get_mut(position) {
            *slot = Some(result);
        }
    }

    /// Whether every slot has been filled.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Build the report. Unfilled slots are skipped.
    pub fn finish(self, dataset_stats: DatasetStats) -> Report {
        aggregate(dataset_stats, self.slots.into_iter().flatten().collect())
    }
}

/// Pure reduction of check results into a report.
pub fn aggregate(dataset_stats: DatasetStats, checks: Vec<CheckResult>) -> Report {
    let mut severity_counts: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();
    let mut counts = Counts::default();

    for check in &checks {
        if check.passed {
            counts.checks_passed += 1;
        } else {
            counts.checks_failed += 1;
        }
        for finding in &check.findings {
            *severity_counts.entry(finding.severity).or_default() += 1;
            match finding.severity {
                Severity::Info => counts.infos += 1,
                Severity::Minor => counts.warnings += 1,
                Severity::Major | Severity::Blocker => counts.errors += 1,
            }
        }
    }

    let global_status = if counts.checks_failed > 0 {
        GlobalStatus::Fail
    } else {
        GlobalStatus::Pass
    };

    Report {
        dataset_stats,
        checks,
        global_status,
        counts,
        severity_counts,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::validation::Finding;

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

    fn result(name: &str, severities: &[Severity]) -> CheckResult {
        let findings = severities
            .iter()
            .map(|s| Finding::new(name, *s, "x"))
            .collect();
        CheckResult::new(name, findings, Duration::ZERO)
    }

    #[test]
    fn test_aggregate_counts() {
        let report = aggregate(
            stats(),
            vec![
                result("a", &[Severity::Info]),
                result("b", &[Severity::Minor, Severity::Info]),
                result("c", &[Severity::Blocker, Severity::Major]),
                result("d", &[]),
            ],
        );

        assert_eq!(report.global_status, GlobalStatus::Fail);
        assert_eq!(report.counts.checks_passed, 2);
        assert_eq!(report.counts.checks_failed, 2);
        assert_eq!(report.counts.errors, 2);
        assert_eq!(report.counts.warnings, 1);
        assert_eq!(report.counts.infos, 2);
        assert_eq!(report.severity_counts[&Severity::Blocker], 1);
        assert_eq!(report.severity_counts.len(), 4);
    }

    #[test]
    fn test_info_only_passes() {
        let report = aggregate(stats(), vec![result("a", &[Severity::Info]), result("b", &[])]);
        assert_eq!(report.global_status, GlobalStatus::Pass);
        assert_eq!(report.severity_counts[&Severity::Major], 0);
    }

    #[test]
    fn test_slots_keep_canonical_order() {
        let mut aggregator = ResultAggregator::new(3);
        aggregator.insert(2, result("third", &[]));
        aggregator.insert(0, result("first", &[]));
        assert!(!aggregator.is_complete());
        aggregator.insert(1, result("second", &[]));
        assert!(aggregator.is_complete());

        let report = aggregator.finish(stats());
        let names: Vec<&str> = report.checks.iter().map(|c| c.check_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_report_json_shape() {
        let report = aggregate(stats(), vec![result("a", &[Severity::Minor])]);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["global_status"], "FAIL");
        assert_eq!(json["severity_counts"]["MINOR"], 1);
        assert_eq!(json["checks"][0]["findings"][0]["severity"], "MINOR");

        let back: Report = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
