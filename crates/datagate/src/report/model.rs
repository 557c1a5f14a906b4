//! Report shapes, exactly as serialized to JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::DataTable;
use crate::validation::validators::content_hash;
use crate::validation::{CheckResult, Severity};

/// Dataset snapshot taken once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub row_count: usize,
    pub column_count: usize,
    pub null_cell_count: usize,
    pub null_ratio: f64,
    /// Estimated bytes.
    pub memory_estimate: usize,
    pub content_hash: String,
}

impl DatasetStats {
    pub fn from_table(table: &DataTable) -> Self {
        Self {
            row_count: table.row_count(),
            column_count: table.column_count(),
            null_cell_count: table.null_cell_count(),
            null_ratio: table.null_ratio(),
            memory_estimate: table.memory_estimate(),
            content_hash: content_hash(table),
        }
    }
}

/// Overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GlobalStatus {
    Pass,
    Fail,
}

impl GlobalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GlobalStatus::Pass => "PASS",
            GlobalStatus::Fail => "FAIL",
        }
    }
}

/// Derived tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub checks_passed: usize,
    pub checks_failed: usize,
    /// MAJOR and BLOCKER findings.
    pub errors: usize,
    /// MINOR findings.
    pub warnings: usize,
    /// INFO findings.
    pub infos: usize,
}

/// Full output of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub dataset_stats: DatasetStats,
    /// One entry per check, in canonical order.
    pub checks: Vec<CheckResult>,
    pub global_status: GlobalStatus,
    pub counts: Counts,
    pub severity_counts: BTreeMap<Severity, usize>,
}

impl Report {
    /// Whether the run passed.
    pub fn passed(&self) -> bool {
        self.global_status == GlobalStatus::Pass
    }

    /// Look up a check by name.
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.check_name == name)
    }
}
