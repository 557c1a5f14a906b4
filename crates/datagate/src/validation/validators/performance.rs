use std::cmp::Ordering;
use std::time::Instant;

use indexmap::IndexMap;

use super::require_column;
use crate::dataset::{ColumnKind, DataTable};
use crate::error::CheckError;
use crate::manifest::Manifest;
use crate::validation::{Finding, Severity, Validator};

const NAME: &str = "performance";

/// Rows touched by the iteration benchmark.
const ITERATION_SAMPLE: usize = 100;

const MB: f64 = 1024.0 * 1024.0;

/// Memory thresholds plus a few timed micro-benchmarks.
pub struct PerformanceValidator;

impl Validator for PerformanceValidator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError> {
        let limits = &manifest.thresholds;
        let mut findings = Vec::new();

        let memory_mb = table.memory_estimate() as f64 / MB;
        let (severity, verdict) = if memory_mb > limits.memory_hard_limit_mb {
            (Severity::Major, "above the hard limit")
        } else if memory_mb > limits.memory_soft_limit_mb {
            (Severity::Minor, "above the soft limit")
        } else {
            (Severity::Info, "within limits")
        };
        findings.push(Finding::new(
            NAME,
            severity,
            format!(
                "memory estimate {:.2} MB {} (soft {} MB, hard {} MB)",
                memory_mb, verdict, limits.memory_soft_limit_mb, limits.memory_hard_limit_mb
            ),
        ));

        if table.row_count() > limits.large_dataset_rows {
            findings.push(Finding::new(
                NAME,
                Severity::Minor,
                format!(
                    "large dataset: {} rows exceeds {}",
                    table.row_count(),
                    limits.large_dataset_rows
                ),
            ));
        }

        if table.column_count() == 0 {
            return Ok(findings);
        }

        let config = &manifest.performance;
        let filter_col = pick_column(table, config.filter_column.as_deref(), ColumnKind::Numeric)?;
        let group_col = pick_column(table, config.group_column.as_deref(), ColumnKind::Text)?;
        let sort_col = pick_column(table, config.sort_column.as_deref(), ColumnKind::Numeric)?;

        findings.push(bench_iterate(table));
        findings.push(bench_filter(table, filter_col));
        findings.push(bench_group(table, group_col));
        findings.push(bench_sort(table, sort_col));

        Ok(findings)
    }
}

/// Configured column, else the first column of the preferred kind, else the first column.
fn pick_column(
    table: &DataTable,
    configured: Option<&str>,
    preferred: ColumnKind,
) -> Result<usize, CheckError> {
    match configured {
        Some(name) => require_column(table, "performance", name),
        None => Ok(table
            .columns()
            .iter()
            .position(|c| c.kind == preferred)
            .unwrap_or(0)),
    }
}

fn timing(label: &str, column: Option<&str>, started: Instant, detail: String) -> Finding {
    let millis = started.elapsed().as_secs_f64() * 1000.0;
    let target = column
        .map(|c| format!(" on '{}'", c))
        .unwrap_or_default();
    Finding::new(
        NAME,
        Severity::Info,
        format!("benchmark {}{}: {:.3} ms ({})", label, target, millis, detail),
    )
}

fn bench_iterate(table: &DataTable) -> Finding {
    let started = Instant::now();
    let bytes: usize = table
        .rows()
        .iter()
        .take(ITERATION_SAMPLE)
        .flat_map(|r| r.values.iter())
        .filter_map(|v| v.render().map(|s| s.len()))
        .sum();
    let rows = table.row_count().min(ITERATION_SAMPLE);
    timing("iterate", None, started, format!("{} rows, {} bytes", rows, bytes))
}

fn bench_filter(table: &DataTable, col: usize) -> Finding {
    let name = &table.columns()[col].name;
    let started = Instant::now();
    let matched = if table.columns()[col].kind == ColumnKind::Numeric {
        let values: Vec<f64> = table.values(col).filter_map(|(_, v)| v.as_f64()).collect();
        let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
        values.iter().filter(|v| **v > mean).count()
    } else {
        table.values(col).filter(|(_, v)| !v.is_null()).count()
    };
    timing("filter", Some(name), started, format!("{} rows matched", matched))
}

fn bench_group(table: &DataTable, col: usize) -> Finding {
    let name = &table.columns()[col].name;
    let started = Instant::now();
    let mut groups: IndexMap<Option<String>, usize> = IndexMap::new();
    for (_, value) in table.values(col) {
        *groups.entry(value.render().map(|s| s.into_owned())).or_default() += 1;
    }
    timing("group-by", Some(name), started, format!("{} groups", groups.len()))
}

fn bench_sort(table: &DataTable, col: usize) -> Finding {
    let name = &table.columns()[col].name;
    let started = Instant::now();
    let mut keys: Vec<(usize, Option<f64>, Option<String>)> = table
        .values(col)
        .map(|(row, v)| (row, v.as_f64(), v.render().map(|s| s.into_owned())))
        .collect();
    keys.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.2.cmp(&b.2),
    });
    timing("sort", Some(name), started, format!("{} rows sorted", keys.len()))
}
