//! Findings, severities and per-check results.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum number of evidence strings carried by a finding.
pub const MAX_EVIDENCE: usize = 5;

/// Severity level of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational only, never affects pass/fail.
    Info,
    /// Potential issue that should be reviewed.
    Minor,
    /// Definite issue that should be addressed.
    Major,
    /// The dataset must not be used as is.
    Blocker,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Minor,
        Severity::Major,
        Severity::Blocker,
    ];

    /// Get the report label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Minor => "MINOR",
            Severity::Major => "MAJOR",
            Severity::Blocker => "BLOCKER",
        }
    }

    /// Whether a finding at this level fails its check.
    pub fn is_failing(&self) -> bool {
        *self > Severity::Info
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "MINOR" | "WARNING" => Ok(Severity::Minor),
            "MAJOR" | "ERROR" => Ok(Severity::Major),
            "BLOCKER" => Ok(Severity::Blocker),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// One reported issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Name of the check that raised it.
    pub check_name: String,
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// 1-based row indices. Empty for dataset-level findings.
    #[serde(default)]
    pub affected_rows: BTreeSet<usize>,
    /// Example strings, at most [`MAX_EVIDENCE`].
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl Finding {
    /// Create a finding with no rows and no evidence.
    pub fn new(check_name: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            severity,
            message: message.into(),
            affected_rows: BTreeSet::new(),
            evidence: Vec::new(),
        }
    }

    /// Set the affected rows.
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = usize>) -> Self {
        self.affected_rows = rows.into_iter().collect();
        self
    }

    /// Set the evidence, keeping the first [`MAX_EVIDENCE`] entries.
    pub fn with_evidence<S: Into<String>>(mut self, evidence: impl IntoIterator<Item = S>) -> Self {
        self.evidence = evidence
            .into_iter()
            .take(MAX_EVIDENCE)
            .map(Into::into)
            .collect();
        self
    }
}

/// Outcome of one validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_name: String,
    /// True iff every finding is INFO.
    pub passed: bool,
    pub findings: Vec<Finding>,
    /// Wall-clock seconds.
    pub duration: f64,
}

impl CheckResult {
    /// Build a result; `passed` is derived from the findings.
    pub fn new(check_name: impl Into<String>, findings: Vec<Finding>, duration: Duration) -> Self {
        let passed = findings.iter().all(|f| !f.severity.is_failing());
        Self {
            check_name: check_name.into(),
            passed,
            findings,
            duration: duration.as_secs_f64(),
        }
    }

    /// Highest severity among the findings, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    /// Number of findings at a given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Info < Severity::Minor);
        assert!(Severity::Minor < Severity::Major);
        assert!(Severity::Major < Severity::Blocker);
        assert!(!Severity::Info.is_failing());
        assert!(Severity::Minor.is_failing());
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Blocker).unwrap(), "\"BLOCKER\"");
        let parsed: Severity = serde_json::from_str("\"MINOR\"").unwrap();
        assert_eq!(parsed, Severity::Minor);
        assert_eq!("major".parse::<Severity>(), Ok(Severity::Major));
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_evidence_is_bounded() {
        let finding = Finding::new("vocab", Severity::Major, "bad values")
            .with_evidence((0..10).map(|i| format!("value {}", i)));
        assert_eq!(finding.evidence.len(), MAX_EVIDENCE);
        assert_eq!(finding.evidence[0], "value 0");
    }

    #[test]
    fn test_check_result_passed() {
        let empty = CheckResult::new("schema", vec![], Duration::ZERO);
        assert!(empty.passed);

        let info_only = CheckResult::new(
            "schema",
            vec![Finding::new("schema", Severity::Info, "undocumented column")],
            Duration::ZERO,
        );
        assert!(info_only.passed);

        let failing = CheckResult::new(
            "schema",
            vec![
                Finding::new("schema", Severity::Info, "note"),
                Finding::new("schema", Severity::Minor, "warning"),
            ],
            Duration::from_millis(5),
        );
        assert!(!failing.passed);
        assert_eq!(failing.max_severity(), Some(Severity::Minor));
        assert_eq!(failing.count(Severity::Info), 1);
    }

    #[test]
    fn test_finding_json_shape() {
        let finding = Finding::new("uniqueness", Severity::Major, "duplicates").with_rows([3, 1, 3]);
        let json = serde_json::to_value(&finding).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 5);
        assert_eq!(json["affected_rows"], serde_json::json!([1, 3]));
    }
}
