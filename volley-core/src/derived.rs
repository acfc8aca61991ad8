//! Heuristic sub-phase estimates derived from one observed duration
//!
//! None of these values are measured. Each one is a fixed fraction of the
//! single end-to-end latency the caller observed, so every
//! [`DerivedSubMetric`] carries `heuristic: true`. They are reporting
//! annotations, not a latency breakdown.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

// Absorbs floating point error when fractions are computed, e.g. 1/3 three times
const FRACTION_TOLERANCE: f64 = 1e-9;

/// A named share of the total duration, e.g. `distributed_lock = 0.2`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseFraction {
    pub name: String,
    pub fraction: f64,
}

impl PhaseFraction {
    pub fn new(name: impl Into<String>, fraction: f64) -> Self {
        Self {
            name: name.into(),
            fraction,
        }
    }
}

/// A validated set of phase fractions whose sum never exceeds 1.0
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseBreakdown {
    phases: Vec<PhaseFraction>,
}

impl PhaseBreakdown {
    pub fn new(phases: Vec<PhaseFraction>) -> Result<Self> {
        let mut total = 0.0;
        for phase in &phases {
            if phase.name.is_empty() {
                return Err(CoreError::InvalidBreakdown(
                    "phase name cannot be empty".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&phase.fraction) {
                return Err(CoreError::InvalidBreakdown(format!(
                    "fraction for '{}' must be within [0, 1], got {}",
                    phase.name, phase.fraction
                )));
            }
            total += phase.fraction;
        }

        if total > 1.0 + FRACTION_TOLERANCE {
            return Err(CoreError::InvalidBreakdown(format!(
                "fractions sum to {:.3}, which exceeds the observed total",
                total
            )));
        }

        Ok(Self { phases })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn phases(&self) -> &[PhaseFraction] {
        &self.phases
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Apportion `total_ms` across the phases
    pub fn derive(&self, total_ms: f64) -> Vec<DerivedSubMetric> {
        self.phases
            .iter()
            .map(|phase| DerivedSubMetric {
                name: phase.name.clone(),
                fraction: phase.fraction,
                value_ms: total_ms * phase.fraction,
                heuristic: true,
            })
            .collect()
    }
}

/// An estimated sub-phase duration. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedSubMetric {
    pub name: String,
    pub fraction: f64,
    pub value_ms: f64,
    /// Always true: the value is `fraction * total`, not a measurement
    pub heuristic: bool,
}

/// Treats responses at or under `threshold_ms` as likely cache hits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheHitHeuristic {
    pub threshold_ms: f64,
}

impl CacheHitHeuristic {
    pub fn new(threshold_ms: f64) -> Self {
        Self { threshold_ms }
    }

    pub fn is_hit(&self, duration_ms: f64) -> bool {
        duration_ms <= self.threshold_ms
    }
}
