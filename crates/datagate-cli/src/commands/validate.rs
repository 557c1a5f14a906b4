//! Validate command - run the check battery and write the reports.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use colored::Colorize;
use datagate::report::{self, OutputFormat};
use datagate::{Manifest, Orchestrator, OrchestratorConfig, Report, Severity};

use super::exit_code;

pub fn run(
    dataset: PathBuf,
    manifest: Option<PathBuf>,
    output: PathBuf,
    format: OutputFormat,
    timeout: u64,
    sequential: bool,
    verbose: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    if !dataset.exists() {
        return Err(format!("File not found: {}", dataset.display()).into());
    }

    let manifest = match &manifest {
        Some(path) => Manifest::load(path)?,
        None => Manifest::default(),
    };

    println!(
        "{} {}",
        "Validating".cyan().bold(),
        dataset.display().to_string().white()
    );

    let mut config = OrchestratorConfig::default().with_timeout(Duration::from_secs(timeout));
    if sequential {
        config = config.sequential();
    }
    let (report, stats) = Orchestrator::with_config(config).validate_file(&dataset, manifest)?;

    if verbose {
        println!(
            "Loaded {} rows x {} columns ({}, {} bytes) in {:.3}s",
            stats.row_count, stats.column_count, stats.format, stats.size_bytes, stats.load_duration
        );
        println!("File hash: {}", stats.file_hash);
    }

    println!();
    print_checks(&report, verbose);
    println!();
    print_summary(&report);

    let timestamp = report::run_timestamp(Local::now());
    let written = report::write_run(&report, &output, &timestamp, format)?;

    println!();
    println!(
        "{} {} files to {}",
        "Wrote".green().bold(),
        written.len(),
        output.display().to_string().white()
    );
    if verbose {
        for path in &written {
            println!("  {}", path.display());
        }
    }

    Ok(exit_code(&report))
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Blocker => severity.label().red().bold(),
        Severity::Major => severity.label().red(),
        Severity::Minor => severity.label().yellow(),
        Severity::Info => severity.label().blue(),
    }
}

fn print_checks(report: &Report, verbose: bool) {
    for check in &report.checks {
        let status = if check.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!(
            "  {} {:16} {:>3} findings  {:.3}s",
            status,
            check.check_name,
            check.findings.len(),
            check.duration
        );

        for finding in &check.findings {
            if !verbose && !finding.severity.is_failing() {
                continue;
            }
            println!("       {:8} {}", severity_label(finding.severity), finding.message);
        }
    }
}

fn print_summary(report: &Report) {
    let status = if report.passed() {
        report.global_status.label().green().bold()
    } else {
        report.global_status.label().red().bold()
    };
    println!("Status: {}", status);
    println!(
        "Checks: {} passed, {} failed",
        report.counts.checks_passed.to_string().green(),
        report.counts.checks_failed.to_string().red()
    );
    println!(
        "Findings: {} errors, {} warnings, {} info",
        report.counts.errors.to_string().red(),
        report.counts.warnings.to_string().yellow(),
        report.counts.infos.to_string().blue()
    );
    println!("Content hash: {}", report.dataset_stats.content_hash);
}
