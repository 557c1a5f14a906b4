//! Report files on disk.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::markdown::{render_check_markdown, render_summary_markdown};
use super::model::Report;
use crate::error::{DatagateError, Result};

/// Which report files a run writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    #[default]
    Both,
}

impl OutputFormat {
    fn json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }

    fn markdown(&self) -> bool {
        matches!(self, OutputFormat::Markdown | OutputFormat::Both)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DatagateError + '_ {
    move |source| DatagateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
    }
    Ok(())
}

/// Save a report as pretty-printed JSON.
pub fn save_json(report: &Report, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let file = File::create(path).map_err(io_error(path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    Ok(())
}

/// Load a report previously written by [`save_json`].
pub fn load_json(path: impl AsRef<Path>) -> Result<Report> {
    let path = path.as_ref();
    let file = File::open(path).map_err(io_error(path))?;
    let report = serde_json::from_reader(BufReader::new(file))?;
    Ok(report)
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, text).map_err(io_error(path))
}

/// Timestamp suffix used in report file names.
pub fn run_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Write the files of one run into `out_dir` and return their paths.
///
/// Produces `validation_report_<ts>.json`, `validation_summary_<ts>.md` and
/// one `check_<name>_<ts>.md` per check, filtered by `format`.
pub fn write_run(
    report: &Report,
    out_dir: impl AsRef<Path>,
    timestamp: &str,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir).map_err(io_error(out_dir))?;
    let mut written = Vec::new();

    if format.json() {
        let path = out_dir.join(format!("validation_report_{}.json", timestamp));
        save_json(report, &path)?;
        written.push(path);
    }

    if format.markdown() {
        let path = out_dir.join(format!("validation_summary_{}.md", timestamp));
        write_text(&path, &render_summary_markdown(report))?;
        written.push(path);

        for check in &report.checks {
            let path = out_dir.join(format!("check_{}_{}.md", check.check_name, timestamp));
            write_text(&path, &render_check_markdown(check, report))?;
            written.push(path);
        }
    }

    Ok(written)
}
