//! Derived metrics recorder
//!
//! One recorder exists per simulated operation (login, like toggle, ...). Each
//! call classifies the outcome, apportions the observed duration into
//! heuristic sub-phases, and appends the samples to the shared registry.

use serde::Serialize;
use tracing::trace;

use crate::derived::{CacheHitHeuristic, DerivedSubMetric, PhaseBreakdown};
use crate::metrics::{Counter, MetricsRegistry, Rate, Trend};
use crate::outcome::{ObservedOutcome, SuccessPolicy};

/// Parsed state of a response body
#[derive(Debug, Clone, PartialEq)]
pub enum BodyState {
    /// The `data` member of a `{ "data": ... }` envelope
    Data(serde_json::Value),
    /// No body at all
    Empty,
    /// Not JSON, or JSON without the expected envelope
    Malformed,
}

/// Static description of what a recorder measures
#[derive(Debug, Clone)]
pub struct RecorderSpec {
    /// Metric name prefix, e.g. `like_toggle`
    pub operation: String,
    pub success: SuccessPolicy,
    pub breakdown: PhaseBreakdown,
    pub cache_hit: Option<CacheHitHeuristic>,
}

impl RecorderSpec {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            success: SuccessPolicy::default(),
            breakdown: PhaseBreakdown::empty(),
            cache_hit: None,
        }
    }

    pub fn with_success(mut self, success: SuccessPolicy) -> Self {
        self.success = success;
        self
    }

    pub fn with_breakdown(mut self, breakdown: PhaseBreakdown) -> Self {
        self.breakdown = breakdown;
        self
    }

    pub fn with_cache_hit(mut self, threshold_ms: f64) -> Self {
        self.cache_hit = Some(CacheHitHeuristic::new(threshold_ms));
        self
    }
}

/// Everything one call contributed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCall {
    pub outcome: ObservedOutcome,
    /// Heuristic sub-phase estimates; empty unless the call succeeded
    pub derived: Vec<DerivedSubMetric>,
    /// Heuristic cache-hit flag; `None` unless configured and successful
    pub cache_hit: Option<bool>,
}

impl RecordedCall {
    pub fn derived_ms(&self, phase: &str) -> Option<f64> {
        self.derived
            .iter()
            .find(|metric| metric.name == phase)
            .map(|metric| metric.value_ms)
    }
}

/// Records classified outcomes and derived sub-metrics for one operation
#[derive(Debug, Clone)]
pub struct OutcomeRecorder {
    spec: RecorderSpec,
    registry: MetricsRegistry,
    attempts: Counter,
    success_rate: Rate,
    response_time: Trend,
    phase_trends: Vec<Trend>,
    cache_hit_rate: Option<Rate>,
}

impl OutcomeRecorder {
    pub fn new(registry: &MetricsRegistry, spec: RecorderSpec) -> Self {
        let op = &spec.operation;
        let phase_trends = spec
            .breakdown
            .phases()
            .iter()
            .map(|phase| registry.trend(&format!("{}_{}_time", op, phase.name)))
            .collect();
        let cache_hit_rate = spec
            .cache_hit
            .map(|_| registry.rate(&format!("{}_cache_hit_rate", op)));

        Self {
            attempts: registry.counter(&format!("{}_attempts", op)),
            success_rate: registry.rate(&format!("{}_success_rate", op)),
            response_time: registry.trend(&format!("{}_response_time", op)),
            phase_trends,
            cache_hit_rate,
            registry: registry.clone(),
            spec,
        }
    }

    pub fn operation(&self) -> &str {
        &self.spec.operation
    }

    /// Classify and record one call from its duration and status
    pub fn record_outcome(&self, total_duration_ms: f64, status: u16) -> ObservedOutcome {
        self.record(total_duration_ms, status, &BodyState::Empty)
            .outcome
    }

    /// Classify and record one call, downgrading successes with unusable bodies
    pub fn record(&self, total_duration_ms: f64, status: u16, body: &BodyState) -> RecordedCall {
        let mut outcome = ObservedOutcome::new(total_duration_ms, status, &self.spec.success);
        if outcome.success && *body == BodyState::Malformed {
            outcome = outcome.unclassified();
        }

        self.attempts.increment();
        self.response_time.add(total_duration_ms);
        self.success_rate.add(outcome.success);

        if let Some(counter) = outcome.kind.error_counter() {
            self.registry.counter(counter).increment();
        }

        let (derived, cache_hit) = if outcome.success {
            let derived = self.spec.breakdown.derive(total_duration_ms);
            for (metric, trend) in derived.iter().zip(&self.phase_trends) {
                trend.add(metric.value_ms);
            }

            let cache_hit = self.spec.cache_hit.map(|h| h.is_hit(total_duration_ms));
            if let (Some(hit), Some(rate)) = (cache_hit, &self.cache_hit_rate) {
                rate.add(hit);
            }
            (derived, cache_hit)
        } else {
            (Vec::new(), None)
        };

        trace!(
            "{}: status={} kind={} duration={:.1}ms",
            self.spec.operation,
            status,
            outcome.kind,
            total_duration_ms
        );

        RecordedCall {
            outcome,
            derived,
            cache_hit,
        }
    }
}
