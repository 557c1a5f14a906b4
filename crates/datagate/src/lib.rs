//! Datagate: production-readiness quality gate for tabular datasets.
//!
//! A dataset is checked against a YAML manifest by a fixed battery of nine
//! validators. Each produces severity-classified findings, and the results
//! reduce into one report with a PASS/FAIL verdict.
//!
//! # Core Principles
//!
//! - **Read-only**: the dataset is never modified, only reported on
//! - **Isolated checks**: one failing check never hides the findings of another
//! - **Deterministic**: two runs over the same data produce the same report
//!
//! # Example
//!
//! ```no_run
//! use datagate::{Manifest, Orchestrator};
//!
//! let manifest = Manifest::load("dataset.manifest.yaml").unwrap();
//! let (report, _stats) = Orchestrator::new()
//!     .validate_file("dataset.csv", manifest)
//!     .unwrap();
//!
//! println!("Status: {}", report.global_status.label());
//! println!("Errors: {}", report.counts.errors);
//! ```

pub mod dataset;
pub mod error;
pub mod manifest;
pub mod report;
pub mod stats;
pub mod validation;

mod orchestrator;

pub use crate::orchestrator::{DEFAULT_CHECK_TIMEOUT, Orchestrator, OrchestratorConfig};
pub use dataset::{ColumnDescriptor, ColumnKind, DataTable, LoadStats, Loader, LoaderConfig, Row, Value};
pub use error::{CheckError, DatagateError, Result};
pub use manifest::Manifest;
pub use report::{GlobalStatus, OutputFormat, Report};
pub use validation::{CheckResult, Finding, Severity, Validator};
