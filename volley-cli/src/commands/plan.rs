//! `volley plan`

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use volley_config::VolleyConfig;
use volley_core::{Checks, ExecutionPlan, MetricsRegistry, Threshold, WorkloadProfile};
use volley_runner::Workload as _;
use volley_workloads::{find, WorkloadEnv};

/// What a run would execute, without executing it
#[derive(Debug, Serialize)]
pub struct PlanView {
    pub workload: String,
    pub base_url: String,
    pub scenarios: BTreeMap<String, WorkloadProfile>,
    pub thresholds: Vec<Threshold>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

/// Resolve the plan for `workload` and the configured scenario
pub fn build_plan(config: &VolleyConfig, workload: &str) -> Result<PlanView> {
    let entry = find(workload)?;
    let (scenario, profile) =
        ExecutionPlan::select(&(entry.profiles)(), &config.run.scenario).into_single()?;

    let registry = MetricsRegistry::new();
    let checks = Checks::new(&registry);
    let env = WorkloadEnv::new(config, &registry, &checks)?;
    let thresholds = (entry.build)(env)?.thresholds(&scenario);

    Ok(PlanView {
        workload: entry.name.to_string(),
        base_url: config.target.base_url.clone(),
        scenarios: BTreeMap::from([(scenario, profile)]),
        thresholds,
        params: config.run.params.clone(),
    })
}

pub fn print_plan(config: &VolleyConfig, workload: &str) -> Result<()> {
    let plan = build_plan(config, workload)?;
    let yaml = serde_yaml::to_string(&plan).context("Failed to serialize plan to YAML")?;
    print!("{}", yaml);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_keeps_only_selected_scenario() {
        let mut config = VolleyConfig::default();
        config.run.scenario = "capacity".to_string();

        let plan = build_plan(&config, "comment-modify-burst").unwrap();
        assert_eq!(plan.scenarios.len(), 1);
        assert_eq!(
            plan.scenarios["capacity"].executor_name(),
            "ramping-arrival-rate"
        );
        assert_eq!(plan.thresholds.len(), 2);
        assert_eq!(plan.thresholds[1].expressions, vec!["p(95)<3200".to_string()]);

        let yaml = serde_yaml::to_string(&plan).unwrap();
        assert!(yaml.contains("capacity"));
        assert!(!yaml.contains("smoke"));
    }

    #[test]
    fn test_unknown_scenario_fails_fast() {
        let mut config = VolleyConfig::default();
        config.run.scenario = "soak".to_string();

        let err = build_plan(&config, "auth-login-rate-limit").unwrap_err();
        assert!(format!("{:#}", err).contains("soak"));
    }

    #[test]
    fn test_unknown_workload() {
        let config = VolleyConfig::default();
        assert!(build_plan(&config, "checkout").is_err());
    }
}
