//! Pass/fail criteria over aggregate metrics
//!
//! Expressions follow k6 notation: `rate<0.05`, `p(95)<500`, `avg<1400`,
//! `count>0`, `max<=2000`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::metrics::{MetricSnapshot, MetricsRegistry};

/// Statistic an expression reads from a metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Rate,
    Count,
    Avg,
    Min,
    Med,
    Max,
    Percentile(f64),
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Rate => write!(f, "rate"),
            Aggregation::Count => write!(f, "count"),
            Aggregation::Avg => write!(f, "avg"),
            Aggregation::Min => write!(f, "min"),
            Aggregation::Med => write!(f, "med"),
            Aggregation::Max => write!(f, "max"),
            Aggregation::Percentile(p) => write!(f, "p({})", p),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    pub fn holds(&self, observed: f64, limit: f64) -> bool {
        match self {
            Comparison::Lt => observed < limit,
            Comparison::Le => observed <= limit,
            Comparison::Gt => observed > limit,
            Comparison::Ge => observed >= limit,
            Comparison::Eq => (observed - limit).abs() < f64::EPSILON,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
        }
    }
}

/// A single parsed expression such as `p(95)<500`
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdExpr {
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub limit: f64,
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.aggregation, self.comparison.as_str(), self.limit)
    }
}

impl FromStr for ThresholdExpr {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidThreshold {
            expression: s.to_string(),
            reason: reason.to_string(),
        };

        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let split = compact
            .find(|c| matches!(c, '<' | '>' | '='))
            .ok_or_else(|| invalid("missing comparison operator"))?;
        let (lhs, rest) = compact.split_at(split);

        let (comparison, rhs) = if let Some(rhs) = rest.strip_prefix("<=") {
            (Comparison::Le, rhs)
        } else if let Some(rhs) = rest.strip_prefix(">=") {
            (Comparison::Ge, rhs)
        } else if let Some(rhs) = rest.strip_prefix("==") {
            (Comparison::Eq, rhs)
        } else if let Some(rhs) = rest.strip_prefix('<') {
            (Comparison::Lt, rhs)
        } else if let Some(rhs) = rest.strip_prefix('>') {
            (Comparison::Gt, rhs)
        } else {
            return Err(invalid("unsupported comparison operator"));
        };

        let aggregation = match lhs {
            "rate" => Aggregation::Rate,
            "count" => Aggregation::Count,
            "avg" => Aggregation::Avg,
            "min" => Aggregation::Min,
            "med" => Aggregation::Med,
            "max" => Aggregation::Max,
            other => {
                let p = other
                    .strip_prefix("p(")
                    .and_then(|inner| inner.strip_suffix(')'))
                    .ok_or_else(|| invalid("unknown aggregation"))?
                    .parse::<f64>()
                    .map_err(|_| invalid("percentile is not a number"))?;
                if !(0.0..=100.0).contains(&p) {
                    return Err(invalid("percentile must be within [0, 100]"));
                }
                Aggregation::Percentile(p)
            }
        };

        let limit = rhs
            .parse::<f64>()
            .map_err(|_| invalid("limit is not a number"))?;

        Ok(Self {
            aggregation,
            comparison,
            limit,
        })
    }
}

/// All expressions attached to one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: String,
    pub expressions: Vec<String>,
}

impl Threshold {
    pub fn new<I, S>(metric: impl Into<String>, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metric: metric.into(),
            expressions: expressions.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse every expression without evaluating anything
    pub fn parse(&self) -> Result<Vec<ThresholdExpr>> {
        self.expressions.iter().map(|expr| expr.parse()).collect()
    }
}

/// Outcome of one expression at run end
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    /// `None` when the metric recorded no samples
    pub observed: Option<f64>,
    pub passed: bool,
}

/// Evaluate thresholds against the registry.
///
/// Rates and trends without samples pass, as nothing crossed them. Missing
/// counters read as zero, so `count>0` fails on a metric that never fired.
pub fn evaluate(
    thresholds: &[Threshold],
    registry: &MetricsRegistry,
    elapsed: Duration,
) -> Result<Vec<ThresholdResult>> {
    let mut results = Vec::new();

    for threshold in thresholds {
        let snapshot = registry.snapshot_of(&threshold.metric, elapsed);

        for (raw, expr) in threshold.expressions.iter().zip(threshold.parse()?) {
            let observed = observe(registry, &threshold.metric, snapshot.as_ref(), &expr)
                .map_err(|reason| CoreError::InvalidThreshold {
                    expression: format!("{}: {}", threshold.metric, raw),
                    reason,
                })?;
            let passed = observed.is_none_or(|value| expr.comparison.holds(value, expr.limit));

            debug!(
                "Threshold {} {} -> observed {:?}, passed {}",
                threshold.metric, raw, observed, passed
            );

            results.push(ThresholdResult {
                metric: threshold.metric.clone(),
                expression: raw.clone(),
                observed,
                passed,
            });
        }
    }

    Ok(results)
}

fn observe(
    registry: &MetricsRegistry,
    metric: &str,
    snapshot: Option<&MetricSnapshot>,
    expr: &ThresholdExpr,
) -> std::result::Result<Option<f64>, String> {
    let mismatch = |kind: &str| {
        Err(format!(
            "'{}' does not apply to a {} metric",
            expr.aggregation, kind
        ))
    };

    match snapshot {
        None => match expr.aggregation {
            Aggregation::Count => Ok(Some(0.0)),
            _ => Ok(None),
        },
        Some(MetricSnapshot::Counter { count, rate }) => match expr.aggregation {
            Aggregation::Count => Ok(Some(*count as f64)),
            Aggregation::Rate => Ok(Some(*rate)),
            _ => mismatch("counter"),
        },
        Some(MetricSnapshot::Rate { rate, passes, fails }) => match expr.aggregation {
            Aggregation::Rate if passes + fails == 0 => Ok(None),
            Aggregation::Rate => Ok(Some(*rate)),
            _ => mismatch("rate"),
        },
        Some(MetricSnapshot::Trend(stats)) => {
            if stats.count == 0 {
                return match expr.aggregation {
                    Aggregation::Rate => mismatch("trend"),
                    Aggregation::Count => Ok(Some(0.0)),
                    _ => Ok(None),
                };
            }
            match expr.aggregation {
                Aggregation::Count => Ok(Some(stats.count as f64)),
                Aggregation::Avg => Ok(Some(stats.avg)),
                Aggregation::Min => Ok(Some(stats.min)),
                Aggregation::Med => Ok(Some(stats.med)),
                Aggregation::Max => Ok(Some(stats.max)),
                Aggregation::Percentile(p) => Ok(registry.trend_percentile(metric, p)),
                Aggregation::Rate => mismatch("trend"),
            }
        }
    }
}
