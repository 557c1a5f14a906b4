//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Datagate: production-readiness quality gate for tabular datasets
#[derive(Parser)]
#[command(name = "datagate")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a dataset against a manifest and write the reports
    Validate {
        /// Path to the dataset (CSV/TSV)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Path to the validation manifest (YAML)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Directory for report files
        #[arg(short, long, default_value = "reports")]
        output: PathBuf,

        /// Report files to write
        #[arg(short, long, default_value = "both")]
        format: FormatChoice,

        /// Per-check timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Run checks one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Re-render Markdown from a saved JSON report
    Render {
        /// Path to a validation_report_<ts>.json file
        #[arg(value_name = "REPORT_JSON")]
        report: PathBuf,

        /// Directory for the Markdown files (default: next to the report)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Debug, Default)]
pub enum FormatChoice {
    Json,
    Markdown,
    #[default]
    Both,
}

impl std::str::FromStr for FormatChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(FormatChoice::Json),
            "markdown" | "md" => Ok(FormatChoice::Markdown),
            "both" => Ok(FormatChoice::Both),
            _ => Err(format!("Unknown format: {}. Use json, markdown, or both.", s)),
        }
    }
}

impl std::fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatChoice::Json => write!(f, "json"),
            FormatChoice::Markdown => write!(f, "markdown"),
            FormatChoice::Both => write!(f, "both"),
        }
    }
}

impl From<FormatChoice> for datagate::OutputFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Json => datagate::OutputFormat::Json,
            FormatChoice::Markdown => datagate::OutputFormat::Markdown,
            FormatChoice::Both => datagate::OutputFormat::Both,
        }
    }
}
