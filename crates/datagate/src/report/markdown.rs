//! Markdown rendering.
//!
//! Everything here reads a [`Report`] only, so a report loaded back from
//! JSON renders the same as one fresh from the orchestrator.

use std::fmt::Write;

use super::model::Report;
use crate::stats::compress_ranges_limited;
use crate::validation::{CheckResult, Severity};

/// Affected rows listed before the range list is cut short.
const MAX_ROW_RANGES: usize = 20;

fn status_label(passed: bool) -> &'static str {
    if passed { "PASS" } else { "FAIL" }
}

fn format_bytes(bytes: usize) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    if mb >= 1.0 {
        format!("{:.2} MB", mb)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

/// Escape pipes so cell text cannot break a table row.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Render the run summary.
pub fn render_summary_markdown(report: &Report) -> String {
    let mut out = String::new();
    let stats = &report.dataset_stats;
    let counts = &report.counts;

    let _ = writeln!(out, "# Dataset Validation Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Status:** {}", report.global_status.label());
    let _ = writeln!(out);

    let _ = writeln!(out, "## Dataset");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|---|---|");
    let _ = writeln!(out, "| Rows | {} |", stats.row_count);
    let _ = writeln!(out, "| Columns | {} |", stats.column_count);
    let _ = writeln!(
        out,
        "| Null cells | {} ({:.2}%) |",
        stats.null_cell_count,
        stats.null_ratio * 100.0
    );
    let _ = writeln!(out, "| Memory estimate | {} |", format_bytes(stats.memory_estimate));
    let _ = writeln!(out, "| Content hash | `{}` |", stats.content_hash);
    let _ = writeln!(out);

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "- Checks passed: {} / {}",
        counts.checks_passed,
        counts.checks_passed + counts.checks_failed
    );
    let _ = writeln!(out, "- Errors (MAJOR + BLOCKER): {}", counts.errors);
    let _ = writeln!(out, "- Warnings (MINOR): {}", counts.warnings);
    let _ = writeln!(out, "- Info: {}", counts.infos);
    let _ = writeln!(out);

    let _ = writeln!(out, "| Severity | Findings |");
    let _ = writeln!(out, "|---|---|");
    for severity in Severity::ALL.iter().rev() {
        let n = report.severity_counts.get(severity).copied().unwrap_or(0);
        let _ = writeln!(out, "| {} | {} |", severity, n);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Checks");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Check | Status | Worst | Findings | Duration |");
    let _ = writeln!(out, "|---|---|---|---|---|");
    for check in &report.checks {
        let worst = check
            .max_severity()
            .map(|s| s.label())
            .unwrap_or("-");
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {:.3}s |",
            check.check_name,
            status_label(check.passed),
            worst,
            check.findings.len(),
            check.duration
        );
    }

    let failing: Vec<_> = report
        .checks
        .iter()
        .flat_map(|c| c.findings.iter())
        .filter(|f| f.severity.is_failing())
        .collect();
    if !failing.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Issues");
        let _ = writeln!(out);
        for severity in [Severity::Blocker, Severity::Major, Severity::Minor] {
            for finding in failing.iter().filter(|f| f.severity == severity) {
                let _ = writeln!(
                    out,
                    "- **{}** [{}] {}",
                    finding.severity,
                    finding.check_name,
                    finding.message
                );
            }
        }
    }

    out
}

/// Render the detail page of one check.
pub fn render_check_markdown(check: &CheckResult, report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Check: {}", check.check_name);
    let _ = writeln!(out);
    let _ = writeln!(out, "**Status:** {}", status_label(check.passed));
    let _ = writeln!(out, "**Duration:** {:.3}s", check.duration);
    let _ = writeln!(
        out,
        "**Dataset:** {} rows x {} columns (`{}`)",
        report.dataset_stats.row_count,
        report.dataset_stats.column_count,
        report.dataset_stats.content_hash
    );
    let _ = writeln!(out);

    if check.findings.is_empty() {
        let _ = writeln!(out, "No findings.");
        return out;
    }

    let _ = writeln!(out, "| # | Severity | Message | Rows |");
    let _ = writeln!(out, "|---|---|---|---|");
    for (i, finding) in check.findings.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            i + 1,
            finding.severity,
            cell(&finding.message),
            finding.affected_rows.len()
        );
    }

    for (i, finding) in check.findings.iter().enumerate() {
        if finding.affected_rows.is_empty() && finding.evidence.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "### {}. {}", i + 1, finding.severity);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", finding.message);
        if !finding.affected_rows.is_empty() {
            let _ = writeln!(out);
            let rows = compress_ranges_limited(&finding.affected_rows, MAX_ROW_RANGES);
            let _ = writeln!(out, "Rows: {}", rows);
        }
        if !finding.evidence.is_empty() {
            let _ = writeln!(out);
            for example in &finding.evidence {
                let _ = writeln!(out, "- `{}`", example);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::report::aggregate::aggregate;
    use crate::report::model::DatasetStats;
    use crate::validation::Finding;

    fn report() -> Report {
        let stats = DatasetStats {
            row_count: 3,
            column_count: 2,
            null_cell_count: 1,
            null_ratio: 1.0 / 6.0,
            memory_estimate: 2048,
            content_hash: "sha256:abc".to_string(),
        };
        let checks = vec![
            CheckResult::new(
                "schema",
                vec![Finding::new("schema", Severity::Info, "undocumented column 'x'")],
                Duration::from_millis(2),
            ),
            CheckResult::new(
                "uniqueness",
                vec![
                    Finding::new("uniqueness", Severity::Major, "2 duplicated rows | key")
                        .with_rows([1, 2])
                        .with_evidence(["A: 2 occurrences"]),
                ],
                Duration::from_millis(1),
            ),
        ];
        aggregate(stats, checks)
    }

    #[test]
    fn test_summary_agrees_with_report() {
        let md = render_summary_markdown(&report());
        assert!(md.contains("**Status:** FAIL"));
        assert!(md.contains("- Checks passed: 1 / 2"));
        assert!(md.contains("| MAJOR | 1 |"));
        assert!(md.contains("| uniqueness | FAIL | MAJOR | 1 |"));
        assert!(md.contains("- **MAJOR** [uniqueness]"));
        assert!(!md.contains("- **INFO**"));
    }

    #[test]
    fn test_check_page() {
        let report = report();
        let md = render_check_markdown(&report.checks[1], &report);
        assert!(md.starts_with("# Check: uniqueness"));
        assert!(md.contains("2 duplicated rows \\| key"));
        assert!(md.contains("Rows: 1-2"));
        assert!(md.contains("- `A: 2 occurrences`"));

        let md = render_check_markdown(&report.checks[0], &report);
        assert!(md.contains("**Status:** PASS"));
    }

    #[test]
    fn test_long_row_lists_are_cut() {
        let report = report();
        let mut check = report.checks[0].clone();
        check.findings = vec![
            Finding::new("uniqueness", Severity::Major, "many").with_rows((1..=100).step_by(2)),
        ];
        let md = render_check_markdown(&check, &report);
        assert!(md.contains("Rows: 1, 3, 5"));
        assert!(md.contains("(30 more)"));
    }
}
