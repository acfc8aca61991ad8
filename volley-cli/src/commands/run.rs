//! `volley run`

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use volley_config::VolleyConfig;
use volley_core::{Checks, ExecutionPlan, MetricsRegistry, RunSummary};
use volley_runner::{Runner, RunnerConfig, Workload as _};
use volley_workloads::{find, WorkloadEnv};

/// Run the configured scenario of `workload` to completion
pub async fn run_workload(config: &VolleyConfig, workload: &str) -> Result<RunSummary> {
    let entry = find(workload)?;
    let (scenario, profile) =
        ExecutionPlan::select(&(entry.profiles)(), &config.run.scenario).into_single()?;

    let registry = MetricsRegistry::new();
    let checks = Checks::new(&registry);
    let env = WorkloadEnv::new(config, &registry, &checks)
        .with_context(|| format!("Failed to prepare workload '{}'", entry.name))?;
    let workload = (entry.build)(env)?;
    let thresholds = workload.thresholds(&scenario);

    info!(
        "Target {} with {} thresholds",
        config.target.base_url,
        thresholds.len()
    );

    let runner = Runner::new(
        &registry,
        RunnerConfig {
            graceful_stop: config.run.graceful_stop,
            ..RunnerConfig::default()
        },
    );
    let report = runner
        .run(&scenario, &profile, Arc::clone(&workload))
        .await
        .with_context(|| format!("Scenario '{}' of '{}' failed", scenario, entry.name))?;

    let summary = report.summarize(workload.name(), &registry, &checks, &thresholds)?;
    if summary.interrupted {
        warn!("Run interrupted, summary covers a partial run");
    }
    Ok(summary)
}

/// Print `summary` to stdout
pub fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", summary.to_json().context("Failed to serialize summary")?);
    } else {
        print!("{}", summary.render_text());
    }
    Ok(())
}
