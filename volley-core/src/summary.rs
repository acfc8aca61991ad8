//! End-of-run summary
//!
//! Rendered to stdout as text or JSON. Writing report files is out of scope.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use crate::checks::CheckResult;
use crate::error::Result;
use crate::metrics::MetricSnapshot;
use crate::threshold::ThresholdResult;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub workload: String,
    pub scenario: String,
    pub executor: String,
    pub started_at: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub interrupted: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, MetricSnapshot>,
    pub checks: BTreeMap<String, CheckResult>,
    pub thresholds: Vec<ThresholdResult>,
}

impl RunSummary {
    /// True when no threshold was crossed
    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|result| result.passed)
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|result| !result.passed)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "workload: {} (scenario: {}, executor: {})",
            self.workload, self.scenario, self.executor
        );
        let _ = writeln!(
            out,
            "started:  {}  elapsed: {}{}",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64)),
            if self.interrupted { " (interrupted)" } else { "" }
        );
        if !self.tags.is_empty() {
            let tags: Vec<String> = self
                .tags
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            let _ = writeln!(out, "tags:     {}", tags.join(", "));
        }

        if !self.checks.is_empty() {
            let _ = writeln!(out, "\nchecks");
            for (name, result) in &self.checks {
                let mark = if result.fails == 0 { "✓" } else { "✗" };
                let _ = writeln!(
                    out,
                    "  {} {:<40} {} passed, {} failed",
                    mark, name, result.passes, result.fails
                );
            }
        }

        let _ = writeln!(out, "\nmetrics");
        for (name, snapshot) in &self.metrics {
            let _ = writeln!(out, "  {:<40} {}", name, format_snapshot(snapshot));
        }

        if !self.thresholds.is_empty() {
            let _ = writeln!(out, "\nthresholds");
            for result in &self.thresholds {
                let mark = if result.passed { "✓" } else { "✗" };
                let observed = result
                    .observed
                    .map(|value| format!("{:.3}", value))
                    .unwrap_or_else(|| "no data".to_string());
                let _ = writeln!(
                    out,
                    "  {} {:<40} {:<16} observed {}",
                    mark, result.metric, result.expression, observed
                );
            }
        }

        out
    }
}

fn format_snapshot(snapshot: &MetricSnapshot) -> String {
    match snapshot {
        MetricSnapshot::Counter { count, rate } => format!("{} ({:.2}/s)", count, rate),
        MetricSnapshot::Rate { rate, passes, fails } => {
            format!("{:.2}% ({} / {})", rate * 100.0, passes, passes + fails)
        }
        MetricSnapshot::Trend(stats) => format!(
            "avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms p(99)={:.2}ms",
            stats.avg, stats.min, stats.med, stats.max, stats.p90, stats.p95, stats.p99
        ),
    }
}
