//! Core domain types for volley
//!
//! This crate holds the pieces every other volley crate builds on: workload
//! profiles and scenario selection, outcome classification, heuristic derived
//! metrics, the shared metrics registry, checks, thresholds and the run
//! summary. It performs no I/O.

pub mod checks;
pub mod derived;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod profile;
pub mod recorder;
pub mod summary;
pub mod threshold;

// Re-export commonly used types at the crate root
pub use checks::{CheckResult, Checks, CHECKS_METRIC};
pub use derived::{CacheHitHeuristic, DerivedSubMetric, PhaseBreakdown, PhaseFraction};
pub use error::{CoreError, Result};
pub use metrics::{Counter, MetricSnapshot, MetricsRegistry, Rate, Trend, TrendStats};
pub use outcome::{classify, ObservedOutcome, OutcomeKind, SuccessPolicy};
pub use profile::{
    select_profile, ExecutionPlan, Executor, Stage, WorkloadProfile, DEFAULT_SCENARIO,
};
pub use recorder::{BodyState, OutcomeRecorder, RecordedCall, RecorderSpec};
pub use summary::RunSummary;
pub use threshold::{evaluate, Threshold, ThresholdExpr, ThresholdResult};
