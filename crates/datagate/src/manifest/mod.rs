//! Validation manifest: what the dataset is expected to look like.
//!
//! The YAML document is first read into a raw [`ManifestFile`] and then checked
//! into a typed [`Manifest`]. Every regex, threshold and severity is validated
//! here so that checks never meet a malformed configuration.

mod file;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

pub use file::{
    BoundingBoxEntry, CoherenceSection, ColumnEntry, ConstraintEntry, GeospatialSection,
    ManifestFile, MembershipEntry, MissingnessEntry, ParityEntry, PerformanceSection,
    ReproducibilitySection, ThresholdsSection, UniquenessSection, VocabularyEntry,
};

use crate::dataset::ColumnKind;
use crate::error::{DatagateError, Result};
use crate::validation::Severity;

/// Expected column declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedColumn {
    pub name: String,
    pub kind: Option<ColumnKind>,
    pub required: bool,
    /// Alternative header names accepted for this column.
    pub aliases: Vec<String>,
}

/// How a constrained column's cells are matched.
#[derive(Debug, Clone)]
pub enum ConstraintFormat {
    Pattern(Regex),
    /// Loose Brazilian phone number family.
    Phone,
}

/// Format rule for one column.
#[derive(Debug, Clone)]
pub struct ConstraintRule {
    pub format: ConstraintFormat,
    /// Literal values accepted regardless of the format.
    pub allow_values: Vec<String>,
    /// Characters removed before matching.
    pub strip_chars: String,
    /// Invalid ratio above which the finding is MAJOR.
    pub max_invalid_ratio: f64,
}

/// Null-ratio limit for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissingnessRule {
    pub max_null_ratio: f64,
    /// Explicit severity; otherwise derived from whether the column is the key.
    pub severity: Option<Severity>,
}

/// Controlled vocabulary for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    pub values: Vec<String>,
    pub allow_null: bool,
    pub severity: Severity,
}

/// What to do with rows where one side of a relation is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    /// Skip them and report the count as a note.
    #[default]
    Exclude,
    /// Count them as affected rows.
    Flag,
}

/// What to do with a `column_a` value the membership table does not list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKey {
    /// Report the rows in an INFO note.
    #[default]
    Note,
    /// Count the rows as mismatches.
    Mismatch,
}

/// `column_a` value must map to one of the listed `column_b` values.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipRule {
    pub name: String,
    pub column_a: String,
    pub column_b: String,
    pub table: IndexMap<String, Vec<String>>,
    pub unknown_key: UnknownKey,
    pub severity: Severity,
}

/// Two list-valued columns must split into the same number of items.
#[derive(Debug, Clone, PartialEq)]
pub struct ParityRule {
    pub name: String,
    pub column_a: String,
    pub column_b: String,
    pub separator: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoherenceConfig {
    pub null_policy: NullPolicy,
    pub membership: Vec<MembershipRule>,
    pub parity: Vec<ParityRule>,
}

/// Geographic rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeospatialConfig {
    pub lat_column: String,
    pub lon_column: String,
    pub bounding_box: BoundingBox,
    pub iqr_multiplier: f64,
    pub check_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniquenessConfig {
    pub primary_key: String,
    pub top_n: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReproducibilityConfig {
    pub expected_hash: Option<String>,
    pub expected_rows: Option<usize>,
}

/// Resource limits used by the performance check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub memory_soft_limit_mb: f64,
    pub memory_hard_limit_mb: f64,
    pub large_dataset_rows: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            memory_soft_limit_mb: 100.0,
            memory_hard_limit_mb: 500.0,
            large_dataset_rows: 1_000_000,
        }
    }
}

/// Columns exercised by the micro-benchmarks. Unset columns are picked automatically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceConfig {
    pub filter_column: Option<String>,
    pub group_column: Option<String>,
    pub sort_column: Option<String>,
}

/// Validated manifest shared read-only by all checks.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub columns: Vec<ExpectedColumn>,
    pub constraints: IndexMap<String, ConstraintRule>,
    pub missingness: IndexMap<String, MissingnessRule>,
    pub vocabularies: IndexMap<String, Vocabulary>,
    pub coherence: Option<CoherenceConfig>,
    pub geospatial: Option<GeospatialConfig>,
    pub uniqueness: Option<UniquenessConfig>,
    pub reproducibility: ReproducibilityConfig,
    pub thresholds: Thresholds,
    pub performance: PerformanceConfig,
}

impl Manifest {
    /// Load and validate a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading manifest from '{}'", path.display());

        let text = fs::read_to_string(path).map_err(|e| DatagateError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_yaml_str(&text).map_err(|e| match e {
            DatagateError::Manifest { message, .. } => DatagateError::Manifest {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse and validate a manifest from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: ManifestFile = if text.trim().is_empty() {
            ManifestFile::default()
        } else {
            serde_yaml::from_str(text)?
        };
        Self::from_file(file)
    }

    /// Validate a raw manifest document.
    pub fn from_file(file: ManifestFile) -> Result<Self> {
        let columns = file
            .columns
            .into_iter()
            .map(|c| -> Result<ExpectedColumn> {
                require_name(&c.name, "columns")?;
                Ok(ExpectedColumn {
                    name: c.name,
                    kind: c.kind,
                    required: c.required,
                    aliases: c.aliases,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut constraints = IndexMap::new();
        for (column, entry) in file.constraints {
            let rule = constraint_rule(&column, entry)?;
            constraints.insert(column, rule);
        }

        let mut missingness = IndexMap::new();
        for (column, entry) in file.missingness {
            check_ratio(entry.max_null_ratio, &format!("missingness.{}.max_null_ratio", column))?;
            missingness.insert(
                column,
                MissingnessRule {
                    max_null_ratio: entry.max_null_ratio,
                    severity: parse_severity(entry.severity.as_deref())?,
                },
            );
        }

        let mut vocabularies = IndexMap::new();
        for (column, entry) in file.vocabularies {
            if entry.values.is_empty() {
                return Err(DatagateError::manifest(format!(
                    "vocabularies.{}: values must not be empty",
                    column
                )));
            }
            vocabularies.insert(
                column,
                Vocabulary {
                    values: entry.values,
                    allow_null: entry.allow_null,
                    severity: parse_severity(entry.severity.as_deref())?.unwrap_or(Severity::Major),
                },
            );
        }

        let coherence = file.coherence.map(coherence_config).transpose()?;
        let geospatial = file.geospatial.map(geospatial_config).transpose()?;

        let uniqueness = file
            .uniqueness
            .map(|u| -> Result<UniquenessConfig> {
                require_name(&u.primary_key, "uniqueness.primary_key")?;
                let top_n = u.top_n.unwrap_or(5);
                if top_n == 0 {
                    return Err(DatagateError::manifest("uniqueness.top_n must be at least 1"));
                }
                Ok(UniquenessConfig {
                    primary_key: u.primary_key,
                    top_n,
                })
            })
            .transpose()?;

        let reproducibility = file
            .reproducibility
            .map(|r| -> Result<ReproducibilityConfig> {
                if let Some(hash) = &r.expected_hash {
                    let hex = hash.trim().trim_start_matches("sha256:");
                    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                        return Err(DatagateError::manifest(format!(
                            "reproducibility.expected_hash '{}' is not a SHA-256 digest",
                            hash
                        )));
                    }
                }
                Ok(ReproducibilityConfig {
                    expected_hash: r.expected_hash,
                    expected_rows: r.expected_rows,
                })
            })
            .transpose()?
            .unwrap_or_default();

        let thresholds = file.thresholds.map(thresholds).transpose()?.unwrap_or_default();

        let performance = file
            .performance
            .map(|p| PerformanceConfig {
                filter_column: p.filter_column,
                group_column: p.group_column,
                sort_column: p.sort_column,
            })
            .unwrap_or_default();

        Ok(Self {
            columns,
            constraints,
            missingness,
            vocabularies,
            coherence,
            geospatial,
            uniqueness,
            reproducibility,
            thresholds,
            performance,
        })
    }

    /// Column kinds the loader should force instead of inferring.
    ///
    /// Declared kinds win. Coordinate columns are numeric; columns matched as
    /// text (constraints, vocabularies, the primary key) stay text so that
    /// values like `0123` or `1.50` keep their spelling.
    pub fn kind_overrides(&self) -> HashMap<String, ColumnKind> {
        let mut overrides = HashMap::new();

        let text_columns = self
            .constraints
            .keys()
            .chain(self.vocabularies.keys())
            .chain(self.uniqueness.iter().map(|u| &u.primary_key));
        for name in text_columns {
            overrides.insert(name.clone(), ColumnKind::Text);
        }

        if let Some(geo) = &self.geospatial {
            overrides.insert(geo.lat_column.clone(), ColumnKind::Numeric);
            overrides.insert(geo.lon_column.clone(), ColumnKind::Numeric);
        }

        for column in &self.columns {
            if let Some(kind) = column.kind {
                overrides.insert(column.name.clone(), kind);
                for alias in &column.aliases {
                    overrides.insert(alias.clone(), kind);
                }
            }
        }

        overrides
    }

    /// The identifier column, if uniqueness is configured.
    pub fn identifier_column(&self) -> Option<&str> {
        self.uniqueness.as_ref().map(|u| u.primary_key.as_str())
    }
}

fn require_name(name: &str, section: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(DatagateError::manifest(format!("{}: empty column name", section)))
    } else {
        Ok(())
    }
}

fn check_ratio(value: f64, field: &str) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DatagateError::manifest(format!(
            "{} must be between 0 and 1, got {}",
            field, value
        )))
    }
}

fn parse_severity(raw: Option<&str>) -> Result<Option<Severity>> {
    raw.map(|s| s.parse::<Severity>().map_err(DatagateError::manifest))
        .transpose()
}

fn constraint_rule(column: &str, entry: ConstraintEntry) -> Result<ConstraintRule> {
    let format = match (entry.pattern, entry.format.as_deref()) {
        (Some(pattern), None) => ConstraintFormat::Pattern(Regex::new(&pattern).map_err(|e| {
            DatagateError::manifest(format!("constraints.{}: invalid pattern: {}", column, e))
        })?),
        (None, Some("phone")) => ConstraintFormat::Phone,
        (None, Some(other)) => {
            return Err(DatagateError::manifest(format!(
                "constraints.{}: unknown format '{}'",
                column, other
            )));
        }
        (Some(_), Some(_)) => {
            return Err(DatagateError::manifest(format!(
                "constraints.{}: set either pattern or format, not both",
                column
            )));
        }
        (None, None) => {
            return Err(DatagateError::manifest(format!(
                "constraints.{}: pattern or format is required",
                column
            )));
        }
    };

    let max_invalid_ratio = entry.max_invalid_ratio.unwrap_or(0.0);
    check_ratio(max_invalid_ratio, &format!("constraints.{}.max_invalid_ratio", column))?;

    Ok(ConstraintRule {
        format,
        allow_values: entry.allow_values,
        strip_chars: entry.strip_chars.unwrap_or_default(),
        max_invalid_ratio,
    })
}

fn coherence_config(section: CoherenceSection) -> Result<CoherenceConfig> {
    let null_policy = match section.null_policy.as_deref() {
        None | Some("exclude") => NullPolicy::Exclude,
        Some("flag") => NullPolicy::Flag,
        Some(other) => {
            return Err(DatagateError::manifest(format!(
                "coherence.null_policy must be 'exclude' or 'flag', got '{}'",
                other
            )));
        }
    };

    let membership = section
        .membership
        .into_iter()
        .map(|m| -> Result<MembershipRule> {
            require_name(&m.column_a, "coherence.membership.column_a")?;
            require_name(&m.column_b, "coherence.membership.column_b")?;
            if m.table.is_empty() {
                return Err(DatagateError::manifest(format!(
                    "coherence.membership '{}': table must not be empty",
                    m.name
                )));
            }
            let unknown_key = match m.unknown_key.as_deref() {
                None | Some("note") => UnknownKey::Note,
                Some("mismatch") => UnknownKey::Mismatch,
                Some(other) => {
                    return Err(DatagateError::manifest(format!(
                        "coherence.membership '{}': unknown_key must be 'note' or 'mismatch', got '{}'",
                        m.name, other
                    )));
                }
            };
            let table = if m.invert { invert_table(m.table) } else { m.table };
            Ok(MembershipRule {
                name: m.name,
                column_a: m.column_a,
                column_b: m.column_b,
                table,
                unknown_key,
                severity: parse_severity(m.severity.as_deref())?.unwrap_or(Severity::Major),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let parity = section
        .parity
        .into_iter()
        .map(|p| -> Result<ParityRule> {
            let separator = p.separator.unwrap_or_else(|| ",".to_string());
            if separator.is_empty() {
                return Err(DatagateError::manifest(format!(
                    "coherence.parity '{}': separator must not be empty",
                    p.name
                )));
            }
            Ok(ParityRule {
                name: p.name,
                column_a: p.column_a,
                column_b: p.column_b,
                separator,
                severity: parse_severity(p.severity.as_deref())?.unwrap_or(Severity::Minor),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CoherenceConfig {
        null_policy,
        membership,
        parity,
    })
}

/// Turn a parent -> children table into child -> parents.
fn invert_table(table: IndexMap<String, Vec<String>>) -> IndexMap<String, Vec<String>> {
    let mut inverted: IndexMap<String, Vec<String>> = IndexMap::new();
    for (parent, children) in table {
        for child in children {
            let parents = inverted.entry(child).or_default();
            if !parents.contains(&parent) {
                parents.push(parent.clone());
            }
        }
    }
    inverted
}

fn geospatial_config(section: GeospatialSection) -> Result<GeospatialConfig> {
    let b = section.bounding_box;
    if !(b.lat_min < b.lat_max && b.lon_min < b.lon_max) {
        return Err(DatagateError::manifest(
            "geospatial.bounding_box: min bounds must be below max bounds",
        ));
    }
    if b.lat_min < -90.0 || b.lat_max > 90.0 || b.lon_min < -180.0 || b.lon_max > 180.0 {
        return Err(DatagateError::manifest(
            "geospatial.bounding_box: bounds outside valid latitude/longitude range",
        ));
    }

    let iqr_multiplier = section.iqr_multiplier.unwrap_or(1.5);
    if !(iqr_multiplier.is_finite() && iqr_multiplier > 0.0) {
        return Err(DatagateError::manifest(format!(
            "geospatial.iqr_multiplier must be positive, got {}",
            iqr_multiplier
        )));
    }

    Ok(GeospatialConfig {
        lat_column: section.lat_column,
        lon_column: section.lon_column,
        bounding_box: BoundingBox {
            lat_min: b.lat_min,
            lat_max: b.lat_max,
            lon_min: b.lon_min,
            lon_max: b.lon_max,
        },
        iqr_multiplier,
        check_duplicates: section.check_duplicates,
    })
}

fn thresholds(section: ThresholdsSection) -> Result<Thresholds> {
    let defaults = Thresholds::default();
    let t = Thresholds {
        memory_soft_limit_mb: section.memory_soft_limit_mb.unwrap_or(defaults.memory_soft_limit_mb),
        memory_hard_limit_mb: section.memory_hard_limit_mb.unwrap_or(defaults.memory_hard_limit_mb),
        large_dataset_rows: section.large_dataset_rows.unwrap_or(defaults.large_dataset_rows),
    };
    if t.memory_soft_limit_mb <= 0.0 || t.memory_soft_limit_mb > t.memory_hard_limit_mb {
        return Err(DatagateError::manifest(format!(
            "thresholds: need 0 < memory_soft_limit_mb ({}) <= memory_hard_limit_mb ({})",
            t.memory_soft_limit_mb, t.memory_hard_limit_mb
        )));
    }
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
columns:
  - name: CNES
    kind: text
  - name: Lat
    kind: numeric
  - name: Telefone
    required: false
constraints:
  CNES:
    pattern: '^\d{7}$'
    allow_values: ["Not informed"]
  Telefone:
    format: phone
missingness:
  CNES:
    max_null_ratio: 0.0
vocabularies:
  UF:
    values: [SP, RJ]
coherence:
  null_policy: flag
  membership:
    - name: uf_region
      column_a: UF
      column_b: Regiao
      invert: true
      table:
        Sudeste: [SP, RJ]
  parity:
    - name: antivenoms
      column_a: Antivenenos
      column_b: Quantidades
geospatial:
  lat_column: Lat
  lon_column: Lon
  bounding_box: {lat_min: -33.75, lat_max: 5.27, lon_min: -73.99, lon_max: -28.85}
uniqueness:
  primary_key: CNES
reproducibility:
  expected_rows: 10
"#;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();

        assert_eq!(manifest.columns.len(), 3);
        assert!(!manifest.columns[2].required);
        assert!(matches!(
            manifest.constraints["Telefone"].format,
            ConstraintFormat::Phone
        ));
        assert_eq!(manifest.vocabularies["UF"].severity, Severity::Major);
        assert!(manifest.vocabularies["UF"].allow_null);

        let coherence = manifest.coherence.as_ref().unwrap();
        assert_eq!(coherence.null_policy, NullPolicy::Flag);
        assert_eq!(coherence.membership[0].table["SP"], vec!["Sudeste".to_string()]);
        assert_eq!(coherence.membership[0].unknown_key, UnknownKey::Note);
        assert_eq!(coherence.parity[0].separator, ",");
        assert_eq!(coherence.parity[0].severity, Severity::Minor);

        let geo = manifest.geospatial.as_ref().unwrap();
        assert_eq!(geo.iqr_multiplier, 1.5);
        assert!(geo.bounding_box.contains(-11.67, -51.37));
        assert!(!geo.bounding_box.contains(-51.37, -11.67));

        assert_eq!(manifest.identifier_column(), Some("CNES"));
        assert_eq!(manifest.uniqueness.as_ref().unwrap().top_n, 5);
        assert_eq!(manifest.reproducibility.expected_rows, Some(10));
        assert_eq!(manifest.thresholds, Thresholds::default());
    }

    #[test]
    fn test_kind_overrides() {
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();
        let overrides = manifest.kind_overrides();
        assert_eq!(overrides["CNES"], ColumnKind::Text);
        assert_eq!(overrides["Lat"], ColumnKind::Numeric);
        assert_eq!(overrides["Lon"], ColumnKind::Numeric);
        assert_eq!(overrides["UF"], ColumnKind::Text);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::from_yaml_str("").unwrap();
        assert!(manifest.columns.is_empty());
        assert!(manifest.geospatial.is_none());
        assert!(manifest.identifier_column().is_none());
    }

    #[test]
    fn test_unknown_key_policy() {
        let yaml = MANIFEST.replace("      invert: true\n", "      invert: true\n      unknown_key: mismatch\n");
        let manifest = Manifest::from_yaml_str(&yaml).unwrap();
        let coherence = manifest.coherence.as_ref().unwrap();
        assert_eq!(coherence.membership[0].unknown_key, UnknownKey::Mismatch);

        let yaml = MANIFEST.replace("      invert: true\n", "      invert: true\n      unknown_key: ignore\n");
        let err = Manifest::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, DatagateError::Manifest { .. }));
    }

    #[test]
    fn test_invalid_regex_fails_fast() {
        let err = Manifest::from_yaml_str("constraints:\n  CNES:\n    pattern: '(['\n").unwrap_err();
        assert!(matches!(err, DatagateError::Manifest { .. }));
    }

    #[test]
    fn test_inverted_bounding_box_rejected() {
        let yaml = r#"
geospatial:
  lat_column: Lat
  lon_column: Lon
  bounding_box: {lat_min: 5.0, lat_max: -33.0, lon_min: -73.99, lon_max: -28.85}
"#;
        assert!(Manifest::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_bad_ratio_and_severity_rejected() {
        assert!(Manifest::from_yaml_str("missingness:\n  A:\n    max_null_ratio: 1.5\n").is_err());
        assert!(
            Manifest::from_yaml_str("vocabularies:\n  A:\n    values: [x]\n    severity: FATAL\n")
                .is_err()
        );
        assert!(Manifest::from_yaml_str("unknown_section: 1\n").is_err());
    }

    #[test]
    fn test_expected_hash_format() {
        let ok = format!("reproducibility:\n  expected_hash: sha256:{}\n", "a".repeat(64));
        assert!(Manifest::from_yaml_str(&ok).is_ok());
        assert!(Manifest::from_yaml_str("reproducibility:\n  expected_hash: abc\n").is_err());
    }
}
