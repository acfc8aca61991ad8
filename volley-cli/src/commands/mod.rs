//! CLI command implementations

pub mod config;
pub mod list;
pub mod plan;
pub mod run;

use anyhow::{Context, Result};
use std::path::Path;
use volley_config::{ConfigLoader, LogLevel, VolleyConfig};

/// Values given on the command line; they win over file and environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub base_url: Option<String>,
    pub scenario: Option<String>,
    pub workload: Option<String>,
    pub params: Vec<(String, String)>,
}

/// Load configuration (file, then `VOLLEY_*` variables) and apply `overrides`
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<VolleyConfig> {
    let mut config = ConfigLoader::new()
        .load(path)
        .context("Failed to load configuration")?;

    if let Some(level) = overrides.log_level {
        config.logging.level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!("Invalid --log-level '{}': {}", level, e))?;
    }
    if let Some(base_url) = overrides.base_url {
        config.target.base_url = base_url;
    }
    if let Some(scenario) = overrides.scenario {
        config.run.scenario = scenario;
    }
    if let Some(workload) = overrides.workload {
        config.run.workload = Some(workload);
    }
    config.run.params.extend(overrides.params);

    config
        .validate_all()
        .context("Invalid command line override")?;
    Ok(config)
}

/// Workload named on the command line or in the configuration
pub fn workload_name(config: &VolleyConfig) -> Result<&str> {
    config.run.workload.as_deref().ok_or_else(|| {
        let available: Vec<_> = volley_workloads::catalog()
            .iter()
            .map(|entry| entry.name)
            .collect();
        anyhow::anyhow!(
            "No workload selected. Pass --workload or set run.workload. Available workloads: {}",
            available.join(", ")
        )
    })
}
