//! Error types for the datagate library.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal error raised before or outside of check orchestration.
///
/// Nothing in this enum is ever turned into a finding: a failure to load the
/// dataset or the manifest means no report can be produced at all.
#[derive(Debug, Error)]
pub enum DatagateError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Empty file or no data to validate.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Manifest is syntactically valid but semantically malformed.
    #[error("Manifest error in '{path}': {message}")]
    Manifest { path: String, message: String },

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// The async runtime could not be started.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl DatagateError {
    /// Build a manifest error for an in-memory document.
    pub(crate) fn manifest(message: impl Into<String>) -> Self {
        DatagateError::Manifest {
            path: "<inline>".to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for datagate operations.
pub type Result<T> = std::result::Result<T, DatagateError>;

/// A validator could not complete.
///
/// The orchestrator converts these into a BLOCKER finding attributed to the
/// failing check and keeps running the rest of the battery.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckError {
    /// A column named in the manifest is absent from the dataset.
    #[error("column '{column}' required by the {section} configuration is not in the dataset")]
    MissingColumn { section: String, column: String },

    /// The manifest section for this check cannot be applied.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The check did not finish within the per-check timeout.
    #[error("check timed out after {0:.1}s")]
    Timeout(f64),

    /// The check panicked.
    #[error("check panicked: {0}")]
    Panicked(String),
}
