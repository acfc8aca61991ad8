//! Outcome of a run and its conversion into a summary

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;
use volley_core::{evaluate, Checks, MetricsRegistry, RunSummary, Threshold};

use crate::error::RunnerResult;

/// What the runner observed while driving a profile
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub scenario: String,
    pub executor: String,
    /// Tags of the profile that ran
    pub tags: BTreeMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub interrupted: bool,
    pub iterations: u64,
    pub iteration_errors: u64,
    /// Arrival-rate iterations that found no free virtual user
    pub dropped_iterations: u64,
    /// In-flight iterations cut off when the graceful stop window ran out
    pub abandoned_iterations: u64,
}

impl RunReport {
    /// Evaluate `thresholds` over the registry and assemble the summary
    pub fn summarize(
        &self,
        workload: &str,
        registry: &MetricsRegistry,
        checks: &Checks,
        thresholds: &[Threshold],
    ) -> RunnerResult<RunSummary> {
        let results = evaluate(thresholds, registry, self.elapsed)?;

        let crossed = results.iter().filter(|result| !result.passed).count();
        if crossed > 0 {
            info!("{} of {} thresholds crossed", crossed, results.len());
        }

        Ok(RunSummary {
            workload: workload.to_string(),
            scenario: self.scenario.clone(),
            executor: self.executor.clone(),
            started_at: self.started_at,
            elapsed: self.elapsed,
            interrupted: self.interrupted,
            tags: self.tags.clone(),
            metrics: registry.snapshot(self.elapsed),
            checks: checks.results(),
            thresholds: results,
        })
    }
}
