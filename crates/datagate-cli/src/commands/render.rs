//! Render command - rebuild Markdown from a saved JSON report.

use std::path::{Path, PathBuf};

use chrono::Local;
use colored::Colorize;
use datagate::report::{self, OutputFormat};

/// Timestamp embedded in a `validation_report_<ts>.json` file name.
fn timestamp_from_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("validation_report_")
        .filter(|ts| !ts.is_empty())
        .map(str::to_string)
}

pub fn run(
    report_path: PathBuf,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !report_path.exists() {
        return Err(format!("Report not found: {}", report_path.display()).into());
    }

    let report = report::load_json(&report_path)?;

    let out_dir = output.unwrap_or_else(|| {
        report_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let timestamp =
        timestamp_from_name(&report_path).unwrap_or_else(|| report::run_timestamp(Local::now()));

    let written = report::write_run(&report, &out_dir, &timestamp, OutputFormat::Markdown)?;

    println!(
        "{} {} ({} checks, status {})",
        "Rendered".green().bold(),
        report_path.display().to_string().white(),
        report.checks.len(),
        report.global_status.label()
    );
    if verbose {
        for path in &written {
            println!("  {}", path.display());
        }
    }

    Ok(())
}
