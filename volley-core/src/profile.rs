//! Workload profiles and scenario selection
//!
//! A workload declares several named profiles (smoke, load, stress, ...) and a
//! run executes exactly one of them. Selection never mutates the declared
//! profiles: [`select_profile`] returns a new, pruned map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Scenario selected when nothing else is configured
pub const DEFAULT_SCENARIO: &str = "smoke";

/// One `(duration, target)` step of a ramping executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// How long it takes to move from the previous target to this one
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Virtual users (ramping-vus) or iterations per time unit (arrival rate)
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

/// Concurrency / arrival-rate model of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "executor", rename_all = "kebab-case")]
pub enum Executor {
    /// A fixed number of virtual users looping for a fixed duration
    ConstantVus {
        vus: u32,
        #[serde(with = "humantime_serde")]
        duration: Duration,
    },

    /// Virtual user count ramps linearly through the stages
    RampingVus {
        #[serde(default)]
        start_vus: u32,
        stages: Vec<Stage>,
    },

    /// Iteration start rate ramps linearly through the stages, independent of
    /// how long iterations take
    RampingArrivalRate {
        #[serde(default)]
        start_rate: u32,
        #[serde(with = "humantime_serde", default = "default_time_unit")]
        time_unit: Duration,
        pre_allocated_vus: u32,
        max_vus: u32,
        stages: Vec<Stage>,
    },
}

fn default_time_unit() -> Duration {
    Duration::from_secs(1)
}

/// A named execution shape. Immutable once declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadProfile {
    #[serde(flatten)]
    pub executor: Executor,

    /// Labels describing the run, e.g. `test_type: smoke`. Reported in the
    /// run summary.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl WorkloadProfile {
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            tags: BTreeMap::new(),
        }
    }

    pub fn constant_vus(vus: u32, duration: Duration) -> Self {
        Self::new(Executor::ConstantVus { vus, duration })
    }

    pub fn ramping_vus(start_vus: u32, stages: Vec<Stage>) -> Self {
        Self::new(Executor::RampingVus { start_vus, stages })
    }

    pub fn ramping_arrival_rate(
        start_rate: u32,
        pre_allocated_vus: u32,
        max_vus: u32,
        stages: Vec<Stage>,
    ) -> Self {
        Self::new(Executor::RampingArrivalRate {
            start_rate,
            time_unit: default_time_unit(),
            pre_allocated_vus,
            max_vus,
            stages,
        })
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Executor name as written in profile declarations
    pub fn executor_name(&self) -> &'static str {
        match self.executor {
            Executor::ConstantVus { .. } => "constant-vus",
            Executor::RampingVus { .. } => "ramping-vus",
            Executor::RampingArrivalRate { .. } => "ramping-arrival-rate",
        }
    }

    /// Wall-clock length of the profile, excluding graceful stop
    pub fn total_duration(&self) -> Duration {
        match &self.executor {
            Executor::ConstantVus { duration, .. } => *duration,
            Executor::RampingVus { stages, .. }
            | Executor::RampingArrivalRate { stages, .. } => {
                stages.iter().map(|stage| stage.duration).sum()
            }
        }
    }

    /// Upper bound of concurrently active virtual users
    pub fn max_vus(&self) -> u32 {
        match &self.executor {
            Executor::ConstantVus { vus, .. } => *vus,
            Executor::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|stage| stage.target)
                .fold(*start_vus, u32::max),
            Executor::RampingArrivalRate { max_vus, .. } => *max_vus,
        }
    }

    /// Target level at `elapsed`: active VUs for VU-based executors,
    /// iterations per time unit for arrival-rate executors.
    ///
    /// Inside a stage the level moves linearly from the previous target to the
    /// stage target. Past the end of the profile the level is zero.
    pub fn target_at(&self, elapsed: Duration) -> f64 {
        if elapsed >= self.total_duration() {
            return 0.0;
        }

        match &self.executor {
            Executor::ConstantVus { vus, .. } => f64::from(*vus),
            Executor::RampingVus { start_vus, stages } => interpolate(*start_vus, stages, elapsed),
            Executor::RampingArrivalRate {
                start_rate, stages, ..
            } => interpolate(*start_rate, stages, elapsed),
        }
    }

    /// Check internal consistency of the profile
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |message: &str| CoreError::InvalidProfile {
            name: name.to_string(),
            message: message.to_string(),
        };

        match &self.executor {
            Executor::ConstantVus { vus, duration } => {
                if *vus == 0 {
                    return Err(invalid("vus must be greater than 0"));
                }
                if duration.is_zero() {
                    return Err(invalid("duration must be greater than 0"));
                }
            }
            Executor::RampingVus { stages, .. } => {
                if stages.is_empty() {
                    return Err(invalid("at least one stage is required"));
                }
                if self.max_vus() == 0 {
                    return Err(invalid("at least one stage must target more than 0 VUs"));
                }
            }
            Executor::RampingArrivalRate {
                time_unit,
                pre_allocated_vus,
                max_vus,
                stages,
                ..
            } => {
                if stages.is_empty() {
                    return Err(invalid("at least one stage is required"));
                }
                if time_unit.is_zero() {
                    return Err(invalid("time_unit must be greater than 0"));
                }
                if *max_vus == 0 {
                    return Err(invalid("max_vus must be greater than 0"));
                }
                if pre_allocated_vus > max_vus {
                    return Err(invalid("pre_allocated_vus cannot exceed max_vus"));
                }
            }
        }

        if self.total_duration().is_zero() {
            return Err(invalid("profile has zero total duration"));
        }

        Ok(())
    }
}

fn interpolate(start: u32, stages: &[Stage], elapsed: Duration) -> f64 {
    let mut from = f64::from(start);
    let mut offset = Duration::ZERO;

    for stage in stages {
        let end = offset + stage.duration;
        if elapsed < end {
            let progress = (elapsed - offset).as_secs_f64() / stage.duration.as_secs_f64();
            return from + (f64::from(stage.target) - from) * progress;
        }
        from = f64::from(stage.target);
        offset = end;
    }

    from
}

/// Keep only the profile named `selected`.
///
/// The result has at most one entry. A name that matches no profile yields an
/// empty map rather than an error; callers that need a runnable plan go
/// through [`ExecutionPlan::into_single`], which rejects the empty case.
pub fn select_profile(
    all_profiles: &BTreeMap<String, WorkloadProfile>,
    selected: &str,
) -> BTreeMap<String, WorkloadProfile> {
    all_profiles
        .iter()
        .filter(|(name, _)| name.as_str() == selected)
        .map(|(name, profile)| (name.clone(), profile.clone()))
        .collect()
}

/// The profiles that will actually run, after pruning
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    requested: String,
    available: Vec<String>,
    profiles: BTreeMap<String, WorkloadProfile>,
}

impl ExecutionPlan {
    /// Prune `all_profiles` down to the `selected` scenario
    pub fn select(all_profiles: &BTreeMap<String, WorkloadProfile>, selected: &str) -> Self {
        let profiles = select_profile(all_profiles, selected);
        debug!(
            "Selected scenario '{}': {} of {} profiles kept",
            selected,
            profiles.len(),
            all_profiles.len()
        );

        Self {
            requested: selected.to_string(),
            available: all_profiles.keys().cloned().collect(),
            profiles,
        }
    }

    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profiles(&self) -> &BTreeMap<String, WorkloadProfile> {
        &self.profiles
    }

    /// Resolve the single runnable profile, failing fast on an unknown name
    pub fn into_single(self) -> Result<(String, WorkloadProfile)> {
        if self.profiles.len() > 1 {
            return Err(CoreError::AmbiguousPlan(self.profiles.len()));
        }

        let Some((name, profile)) = self.profiles.into_iter().next() else {
            return Err(CoreError::UnknownScenario {
                requested: self.requested,
                available: self.available,
            });
        };

        profile.validate(&name)?;
        Ok((name, profile))
    }
}
