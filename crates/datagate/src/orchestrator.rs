//! Check orchestration.
//!
//! Runs the validator battery against one dataset and reduces the results
//! into a [`Report`].
//!
//! # Failure isolation
//!
//! A validator that returns a [`CheckError`], panics, or overruns the
//! per-check timeout yields a single BLOCKER finding attributed to that
//! check. The remaining validators still run and the report is always
//! complete.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::dataset::{DataTable, LoadStats, Loader, LoaderConfig};
use crate::error::{CheckError, DatagateError, Result};
use crate::manifest::Manifest;
use crate::report::{DatasetStats, Report, ResultAggregator};
use crate::validation::{CheckResult, Finding, Severity, Validator, default_validators};

/// Default per-check timeout.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on the wall-clock time of a single check.
    pub check_timeout: Duration,
    /// Run checks concurrently instead of one after another.
    pub parallel: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            parallel: true,
        }
    }
}

impl OrchestratorConfig {
    /// Set the per-check timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Run checks one at a time.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Runs every validator once and builds the report.
pub struct Orchestrator {
    config: OrchestratorConfig,
    validators: Vec<Arc<dyn Validator>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the default configuration and the full battery.
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    /// Create an orchestrator with a custom configuration and the full battery.
    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self::with_validators(config, default_validators())
    }

    /// Create an orchestrator over an explicit validator list.
    ///
    /// The list order is the order of `Report::checks`.
    pub fn with_validators(config: OrchestratorConfig, validators: Vec<Arc<dyn Validator>>) -> Self {
        Self { config, validators }
    }

    /// Get the configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Names of the registered checks, in report order.
    pub fn check_names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Run the battery.
    pub async fn run(&self, table: Arc<DataTable>, manifest: Arc<Manifest>) -> Report {
        let started = Instant::now();
        let timeout = self.config.check_timeout;
        info!(
            checks = self.validators.len(),
            rows = table.row_count(),
            columns = table.column_count(),
            parallel = self.config.parallel,
            "starting validation run"
        );

        let mut aggregator = ResultAggregator::new(self.validators.len());

        if self.config.parallel {
            let handles: Vec<_> = self
                .validators
                .iter()
                .map(|validator| {
                    let name = validator.name();
                    let task = tokio::spawn(run_check(
                        Arc::clone(validator),
                        Arc::clone(&table),
                        Arc::clone(&manifest),
                        timeout,
                    ));
                    (name, task)
                })
                .collect();

            for (position, (name, task)) in handles.into_iter().enumerate() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => failed_result(name, CheckError::Panicked(join_message(e)), Duration::ZERO),
                };
                aggregator.insert(position, result);
            }
        } else {
            for (position, validator) in self.validators.iter().enumerate() {
                let result = run_check(
                    Arc::clone(validator),
                    Arc::clone(&table),
                    Arc::clone(&manifest),
                    timeout,
                )
                .await;
                aggregator.insert(position, result);
            }
        }

        let report = aggregator.finish(DatasetStats::from_table(&table));
        info!(
            status = report.global_status.label(),
            passed = report.counts.checks_passed,
            failed = report.counts.checks_failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "validation run finished"
        );
        report
    }

    /// Run the battery on a dedicated runtime.
    ///
    /// The runtime is shut down without waiting, so a check that overran its
    /// timeout cannot keep the caller blocked.
    pub fn run_blocking(&self, table: DataTable, manifest: Manifest) -> Result<Report> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| DatagateError::Runtime(e.to_string()))?;

        let report = runtime.block_on(self.run(Arc::new(table), Arc::new(manifest)));
        runtime.shutdown_background();
        Ok(report)
    }

    /// Load a dataset file and run the battery on it.
    ///
    /// Column kinds declared or implied by the manifest override inference.
    /// Load errors are fatal and no report is produced.
    pub fn validate_file(
        &self,
        dataset: impl AsRef<Path>,
        manifest: Manifest,
    ) -> Result<(Report, LoadStats)> {
        let loader = Loader::with_config(
            LoaderConfig::default().with_kind_overrides(manifest.kind_overrides()),
        );
        let (table, stats) = loader.load(dataset)?;
        let report = self.run_blocking(table, manifest)?;
        Ok((report, stats))
    }
}

async fn run_check(
    validator: Arc<dyn Validator>,
    table: Arc<DataTable>,
    manifest: Arc<Manifest>,
    timeout: Duration,
) -> CheckResult {
    let name = validator.name();
    debug!(check = name, "starting check");
    let started = Instant::now();

    let task = tokio::task::spawn_blocking(move || validator.validate(&table, &manifest));
    let outcome = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Err(CheckError::Panicked(join_message(e))),
        Err(_) => Err(CheckError::Timeout(timeout.as_secs_f64())),
    };

    match outcome {
        Ok(findings) => {
            let result = CheckResult::new(name, findings, started.elapsed());
            info!(
                check = name,
                duration = result.duration,
                findings = result.findings.len(),
                passed = result.passed,
                "check finished"
            );
            result
        }
        Err(e) => failed_result(name, e, started.elapsed()),
    }
}

fn failed_result(name: &str, error: CheckError, elapsed: Duration) -> CheckResult {
    warn!(check = name, error = %error, "check failed internally");
    let finding = Finding::new(name, Severity::Blocker, format!("internal failure: {}", error));
    CheckResult::new(name, vec![finding], elapsed)
}

fn join_message(error: JoinError) -> String {
    if error.is_panic() {
        panic_message(error.into_panic())
    } else {
        error.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Severity);

    impl Validator for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn validate(&self, _: &DataTable, _: &Manifest) -> std::result::Result<Vec<Finding>, CheckError> {
            Ok(vec![Finding::new(self.0, self.1, "fixed")])
        }
    }

    struct Failing;

    impl Validator for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn validate(&self, _: &DataTable, _: &Manifest) -> std::result::Result<Vec<Finding>, CheckError> {
            Err(CheckError::InvalidConfig("no section".to_string()))
        }
    }

    struct Panicking;

    impl Validator for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn validate(&self, _: &DataTable, _: &Manifest) -> std::result::Result<Vec<Finding>, CheckError> {
            panic!("boom");
        }
    }

    fn table() -> Arc<DataTable> {
        Arc::new(DataTable::from_strings(&["a"], &[vec!["1"]]))
    }

    #[test]
    fn test_config_builders() {
        let config = OrchestratorConfig::default()
            .with_timeout(Duration::from_secs(5))
            .sequential();
        assert_eq!(config.check_timeout, Duration::from_secs(5));
        assert!(!config.parallel);
        assert!(OrchestratorConfig::default().parallel);
    }

    #[test]
    fn test_default_battery_order() {
        assert_eq!(
            Orchestrator::new().check_names(),
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

    #[tokio::test]
    async fn test_internal_failures_are_isolated() {
        let validators: Vec<Arc<dyn Validator>> = vec![
            Arc::new(Fixed("first", Severity::Info)),
            Arc::new(Failing),
            Arc::new(Panicking),
            Arc::new(Fixed("last", Severity::Info)),
        ];
        let orchestrator = Orchestrator::with_validators(OrchestratorConfig::default(), validators);
        let report = orchestrator.run(table(), Arc::new(Manifest::default())).await;

        let names: Vec<&str> = report.checks.iter().map(|c| c.check_name.as_str()).collect();
        assert_eq!(names, vec!["first", "failing", "panicking", "last"]);

        let failing = &report.checks[1];
        assert!(!failing.passed);
        assert_eq!(failing.findings.len(), 1);
        assert_eq!(failing.findings[0].severity, Severity::Blocker);
        assert!(failing.findings[0].message.contains("no section"));

        let panicking = &report.checks[2];
        assert!(!panicking.passed);
        assert!(panicking.findings[0].message.contains("boom"));

        assert!(report.checks[3].passed);
        assert_eq!(report.counts.checks_failed, 2);
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_sequential_matches_parallel() {
        let validators = || -> Vec<Arc<dyn Validator>> {
            vec![
                Arc::new(Fixed("a", Severity::Minor)),
                Arc::new(Fixed("b", Severity::Info)),
            ]
        };
        let manifest = Arc::new(Manifest::default());

        let parallel = Orchestrator::with_validators(OrchestratorConfig::default(), validators())
            .run(table(), Arc::clone(&manifest))
            .await;
        let sequential =
            Orchestrator::with_validators(OrchestratorConfig::default().sequential(), validators())
                .run(table(), manifest)
                .await;

        assert_eq!(parallel.counts, sequential.counts);
        assert_eq!(parallel.global_status, sequential.global_status);
        assert_eq!(parallel.dataset_stats, sequential.dataset_stats);
    }
}
