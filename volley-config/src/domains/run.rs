//! Run selection and workload tuning parameters

use crate::error::{ConfigError, ConfigResult};
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Workload to run when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload: Option<String>,

    /// Name of the profile to keep; every other profile is pruned
    #[serde(default = "default_scenario")]
    pub scenario: String,

    /// How long in-flight iterations may finish after the run ends, in seconds
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_graceful_stop"
    )]
    pub graceful_stop: Duration,

    /// Free-form workload parameters, e.g. `MODIFY_TIMES: "3"`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workload: None,
            scenario: default_scenario(),
            graceful_stop: default_graceful_stop(),
            params: BTreeMap::new(),
        }
    }
}

impl RunConfig {
    /// Raw parameter value
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parse a parameter, falling back to `default` when it is unset
    pub fn param_or<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.param(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::DomainError {
                domain: self.domain_name().to_string(),
                message: format!("Invalid value '{}' for parameter {}: {}", raw, key, e),
            }),
        }
    }

    /// Boolean flag in the `1`/`0` or `true`/`false` style
    pub fn flag(&self, key: &str) -> ConfigResult<bool> {
        match self.param(key).map(|raw| raw.trim().to_lowercase()) {
            None => Ok(false),
            Some(raw) => match raw.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" | "" => Ok(false),
                _ => Err(self.validation_error(format!(
                    "Invalid flag '{}' for parameter {}",
                    raw, key
                ))),
            },
        }
    }
}

impl Validatable for RunConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.scenario, "scenario", self.domain_name())?;
        validate_positive(
            self.graceful_stop.as_secs(),
            "graceful_stop",
            self.domain_name(),
        )?;

        if let Some(workload) = &self.workload {
            validate_required_string(workload, "workload", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "run"
    }
}

fn default_scenario() -> String {
    "smoke".to_string()
}

fn default_graceful_stop() -> Duration {
    Duration::from_secs(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_params(pairs: &[(&str, &str)]) -> RunConfig {
        RunConfig {
            params: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_run_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.scenario, "smoke");
        assert_eq!(config.graceful_stop, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_param_parsing() {
        let config = with_params(&[("MODIFY_TIMES", "5"), ("NORMAL_USER_RATIO", "0.4")]);
        assert_eq!(config.param_or("MODIFY_TIMES", 3u32).unwrap(), 5);
        assert_eq!(config.param_or("RETRIES", 2u32).unwrap(), 2);
        assert_eq!(config.param_or("NORMAL_USER_RATIO", 0.7f64).unwrap(), 0.4);

        let bad = with_params(&[("MODIFY_TIMES", "many")]);
        assert!(bad.param_or("MODIFY_TIMES", 3u32).is_err());
    }

    #[test]
    fn test_flags() {
        let config = with_params(&[("STRICT_200", "1"), ("DEBUG", "0"), ("ODD", "maybe")]);
        assert!(config.flag("STRICT_200").unwrap());
        assert!(!config.flag("DEBUG").unwrap());
        assert!(!config.flag("UNSET").unwrap());
        assert!(config.flag("ODD").is_err());
    }

    #[test]
    fn test_empty_scenario_is_invalid() {
        let config = RunConfig {
            scenario: "  ".to_string(),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
