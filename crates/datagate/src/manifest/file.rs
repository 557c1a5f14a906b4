//! Raw YAML manifest document, as written by users.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dataset::ColumnKind;

/// Top-level manifest document. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestFile {
    #[serde(default)]
    pub columns: Vec<ColumnEntry>,
    #[serde(default)]
    pub constraints: IndexMap<String, ConstraintEntry>,
    #[serde(default)]
    pub missingness: IndexMap<String, MissingnessEntry>,
    #[serde(default)]
    pub vocabularies: IndexMap<String, VocabularyEntry>,
    #[serde(default)]
    pub coherence: Option<CoherenceSection>,
    #[serde(default)]
    pub geospatial: Option<GeospatialSection>,
    #[serde(default)]
    pub uniqueness: Option<UniquenessSection>,
    #[serde(default)]
    pub reproducibility: Option<ReproducibilitySection>,
    #[serde(default)]
    pub thresholds: Option<ThresholdsSection>,
    #[serde(default)]
    pub performance: Option<PerformanceSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnEntry {
    pub name: String,
    #[serde(default)]
    pub kind: Option<ColumnKind>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintEntry {
    #[serde(default)]
    pub pattern: Option<String>,
    /// Named pattern family; only `phone` is known.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub allow_values: Vec<String>,
    #[serde(default)]
    pub strip_chars: Option<String>,
    #[serde(default)]
    pub max_invalid_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MissingnessEntry {
    pub max_null_ratio: f64,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VocabularyEntry {
    pub values: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_null: bool,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoherenceSection {
    #[serde(default)]
    pub null_policy: Option<String>,
    #[serde(default)]
    pub membership: Vec<MembershipEntry>,
    #[serde(default)]
    pub parity: Vec<ParityEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembershipEntry {
    pub name: String,
    pub column_a: String,
    pub column_b: String,
    /// `column_a` value to allowed `column_b` values, or the reverse when `invert` is set.
    pub table: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub invert: bool,
    /// `note` (default) or `mismatch`.
    #[serde(default)]
    pub unknown_key: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParityEntry {
    pub name: String,
    pub column_a: String,
    pub column_b: String,
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeospatialSection {
    pub lat_column: String,
    pub lon_column: String,
    pub bounding_box: BoundingBoxEntry,
    #[serde(default)]
    pub iqr_multiplier: Option<f64>,
    #[serde(default = "default_true")]
    pub check_duplicates: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundingBoxEntry {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniquenessSection {
    pub primary_key: String,
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReproducibilitySection {
    #[serde(default)]
    pub expected_hash: Option<String>,
    #[serde(default)]
    pub expected_rows: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdsSection {
    #[serde(default)]
    pub memory_soft_limit_mb: Option<f64>,
    #[serde(default)]
    pub memory_hard_limit_mb: Option<f64>,
    #[serde(default)]
    pub large_dataset_rows: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceSection {
    #[serde(default)]
    pub filter_column: Option<String>,
    #[serde(default)]
    pub group_column: Option<String>,
    #[serde(default)]
    pub sort_column: Option<String>,
}

fn default_true() -> bool {
    true
}
