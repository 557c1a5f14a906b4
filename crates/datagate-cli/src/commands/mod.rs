//! CLI command implementations.

pub mod render;
pub mod validate;

use datagate::Report;

/// Validation passed.
pub const EXIT_PASS: i32 = 0;
/// Dataset, manifest or report files could not be read or written.
pub const EXIT_FATAL: i32 = 1;
/// Validation failed with at least one MAJOR or BLOCKER finding.
pub const EXIT_FAIL: i32 = 2;
/// Validation failed on MINOR findings only.
pub const EXIT_WARNINGS: i32 = 3;

/// Process exit code for a finished report.
pub fn exit_code(report: &Report) -> i32 {
    if report.passed() {
        EXIT_PASS
    } else if report.counts.errors > 0 {
        EXIT_FAIL
    } else {
        EXIT_WARNINGS
    }
}
