//! Report model, aggregation and export.

mod aggregate;
mod markdown;
mod model;
mod persist;

pub use aggregate::{ResultAggregator, aggregate};
pub use markdown::{render_check_markdown, render_summary_markdown};
pub use model::{Counts, DatasetStats, GlobalStatus, Report};
pub use persist::{OutputFormat, load_json, run_timestamp, save_json, write_run};
