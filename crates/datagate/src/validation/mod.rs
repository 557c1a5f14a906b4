//! Quality checks and the finding model they produce.

mod finding;
pub mod validators;

pub use finding::{CheckResult, Finding, MAX_EVIDENCE, Severity};
pub use validators::{
    CoherenceValidator, ConstraintsValidator, GeospatialValidator, ParsingValidator,
    PerformanceValidator, ReproducibilityValidator, SchemaValidator, UniquenessValidator,
    VocabValidator, default_validators,
};

use crate::dataset::DataTable;
use crate::error::CheckError;
use crate::manifest::Manifest;

/// Trait for a single quality check.
///
/// Implementations are pure functions of the table and the manifest: they hold
/// no mutable state and may run concurrently with each other.
pub trait Validator: Send + Sync {
    /// Stable name used as `check_name` in findings and reports.
    fn name(&self) -> &'static str;

    /// Run the check and return its findings.
    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError>;
}
