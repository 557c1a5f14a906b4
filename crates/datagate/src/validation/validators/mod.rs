//! The nine built-in checks, registered in their canonical order.

mod coherence;
mod constraints;
mod geospatial;
mod parsing;
mod performance;
mod reproducibility;
mod schema;
mod uniqueness;
mod vocab;

use std::sync::Arc;

pub use coherence::CoherenceValidator;
pub use constraints::ConstraintsValidator;
pub use geospatial::GeospatialValidator;
pub use parsing::ParsingValidator;
pub use performance::PerformanceValidator;
pub use reproducibility::{ReproducibilityValidator, content_hash};
pub use schema::SchemaValidator;
pub use uniqueness::{DuplicateCluster, UniquenessValidator, duplicate_clusters};
pub use vocab::VocabValidator;

use super::{Finding, Severity, Validator};
use crate::dataset::DataTable;
use crate::error::CheckError;

/// Every check, in report order.
pub fn default_validators() -> Vec<Arc<dyn Validator>> {
    vec![
        Arc::new(SchemaValidator),
        Arc::new(ParsingValidator),
        Arc::new(ConstraintsValidator),
        Arc::new(VocabValidator),
        Arc::new(CoherenceValidator),
        Arc::new(GeospatialValidator),
        Arc::new(UniquenessValidator),
        Arc::new(ReproducibilityValidator),
        Arc::new(PerformanceValidator),
    ]
}

/// INFO note for a check whose manifest section is absent.
fn not_configured(check: &str, section: &str) -> Finding {
    Finding::new(
        check,
        Severity::Info,
        format!("check not configured: manifest has no '{}' section", section),
    )
}

/// Position of a column the manifest requires.
fn require_column(table: &DataTable, section: &str, column: &str) -> Result<usize, CheckError> {
    table
        .column_index(column)
        .ok_or_else(|| CheckError::MissingColumn {
            section: section.to_string(),
            column: column.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let names: Vec<&str> = default_validators().iter().map(|v| v.name()).collect();
        assert_eq!(
            names,
            vec![
                "schema",
                "parsing",
                "constraints",
                "vocab",
                "coherence",
                "geospatial",
                "uniqueness",
                "reproducibility",
                "performance",
            ]
        );
    }
}
