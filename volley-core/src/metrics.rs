//! Aggregate metrics shared by every virtual user
//!
//! Three kinds exist: [`Counter`] (cumulative count), [`Rate`] (proportion of
//! true samples) and [`Trend`] (distribution of values, in milliseconds).
//! Handles are cheap to clone. Samples are append-only, so concurrent virtual
//! users never conflict beyond a short per-metric critical section.

use hdrhistogram::Histogram;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Trend samples are stored in microseconds
const TREND_SCALE: f64 = 1000.0;

/// Cumulative count
#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Proportion of samples that were true
#[derive(Debug, Clone, Default)]
pub struct Rate {
    passes: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl Rate {
    pub fn add(&self, passed: bool) {
        if passed {
            self.passes.fetch_add(1, Ordering::Relaxed);
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// False samples. A read racing `add` may see the pass before the
    /// total, so this never goes below zero.
    pub fn fails(&self) -> u64 {
        self.total().saturating_sub(self.passes())
    }

    /// Ratio of true samples, 0.0 when nothing was recorded
    pub fn rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.passes() as f64 / total as f64).min(1.0)
        }
    }
}

/// Distribution of millisecond values
#[derive(Debug, Clone)]
pub struct Trend {
    histogram: Arc<Mutex<Histogram<u64>>>,
}

impl Default for Trend {
    fn default() -> Self {
        Self::new()
    }
}

impl Trend {
    pub fn new() -> Self {
        // 3 significant digits of precision
        let histogram = Histogram::new(3).expect("Failed to create trend histogram");
        Self {
            histogram: Arc::new(Mutex::new(histogram)),
        }
    }

    /// Record one value in milliseconds. Negative values are clamped to zero.
    pub fn add(&self, value_ms: f64) {
        let scaled = (value_ms.max(0.0) * TREND_SCALE).round() as u64;
        self.histogram.lock().saturating_record(scaled);
    }

    pub fn add_duration(&self, duration: Duration) {
        self.add(duration.as_secs_f64() * 1000.0);
    }

    pub fn count(&self) -> u64 {
        self.histogram.lock().len()
    }

    pub fn stats(&self) -> TrendStats {
        let histogram = self.histogram.lock();
        if histogram.len() == 0 {
            return TrendStats::default();
        }

        let ms = |value: u64| value as f64 / TREND_SCALE;
        TrendStats {
            count: histogram.len(),
            avg: histogram.mean() / TREND_SCALE,
            min: ms(histogram.min()),
            med: ms(histogram.value_at_quantile(0.50)),
            max: ms(histogram.max()),
            p90: ms(histogram.value_at_quantile(0.90)),
            p95: ms(histogram.value_at_quantile(0.95)),
            p99: ms(histogram.value_at_quantile(0.99)),
        }
    }
}

/// Summary statistics of a trend, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendStats {
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Point-in-time view of one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetricSnapshot {
    Counter { count: u64, rate: f64 },
    Rate { rate: f64, passes: u64, fails: u64 },
    Trend(TrendStats),
}

/// Registry of named metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<RwLock<BTreeMap<String, Counter>>>,
    rates: Arc<RwLock<BTreeMap<String, Rate>>>,
    trends: Arc<RwLock<BTreeMap<String, Trend>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the counter called `name`
    pub fn counter(&self, name: &str) -> Counter {
        get_or_create(&self.counters, name)
    }

    /// Get or create the rate called `name`
    pub fn rate(&self, name: &str) -> Rate {
        get_or_create(&self.rates, name)
    }

    /// Get or create the trend called `name`
    pub fn trend(&self, name: &str) -> Trend {
        get_or_create(&self.trends, name)
    }

    /// Exact percentile `p` (0-100) of a trend, if the trend exists and has samples
    pub fn trend_percentile(&self, name: &str, p: f64) -> Option<f64> {
        let trends = self.trends.read();
        let histogram = trends.get(name)?.histogram.lock();
        if histogram.len() == 0 {
            return None;
        }
        Some(histogram.value_at_percentile(p) as f64 / TREND_SCALE)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.counters.read().contains_key(name)
            || self.rates.read().contains_key(name)
            || self.trends.read().contains_key(name)
    }

    /// Snapshot one metric; counters report their per-second rate over `elapsed`
    pub fn snapshot_of(&self, name: &str, elapsed: Duration) -> Option<MetricSnapshot> {
        if let Some(counter) = self.counters.read().get(name) {
            return Some(counter_snapshot(counter, elapsed));
        }
        if let Some(rate) = self.rates.read().get(name) {
            return Some(rate_snapshot(rate));
        }
        self.trends
            .read()
            .get(name)
            .map(|trend| MetricSnapshot::Trend(trend.stats()))
    }

    /// Snapshot every registered metric
    pub fn snapshot(&self, elapsed: Duration) -> BTreeMap<String, MetricSnapshot> {
        let mut snapshot = BTreeMap::new();

        for (name, counter) in self.counters.read().iter() {
            snapshot.insert(name.clone(), counter_snapshot(counter, elapsed));
        }
        for (name, rate) in self.rates.read().iter() {
            snapshot.insert(name.clone(), rate_snapshot(rate));
        }
        for (name, trend) in self.trends.read().iter() {
            snapshot.insert(name.clone(), MetricSnapshot::Trend(trend.stats()));
        }

        snapshot
    }
}

fn get_or_create<M: Clone + Default>(map: &RwLock<BTreeMap<String, M>>, name: &str) -> M {
    if let Some(metric) = map.read().get(name) {
        return metric.clone();
    }
    map.write().entry(name.to_string()).or_default().clone()
}

fn counter_snapshot(counter: &Counter, elapsed: Duration) -> MetricSnapshot {
    let count = counter.value();
    let seconds = elapsed.as_secs_f64();
    MetricSnapshot::Counter {
        count,
        rate: if seconds > 0.0 {
            count as f64 / seconds
        } else {
            0.0
        },
    }
}

fn rate_snapshot(rate: &Rate) -> MetricSnapshot {
    let passes = rate.passes();
    MetricSnapshot::Rate {
        rate: rate.rate(),
        passes,
        fails: rate.total().saturating_sub(passes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_read_mid_add_does_not_underflow() {
        // A pass recorded but its total not yet bumped
        let rate = Rate {
            passes: Arc::new(AtomicU64::new(3)),
            total: Arc::new(AtomicU64::new(2)),
        };
        assert_eq!(rate.fails(), 0);
        assert_eq!(rate.rate(), 1.0);
        assert!(matches!(
            rate_snapshot(&rate),
            MetricSnapshot::Rate { passes: 3, fails: 0, .. }
        ));
    }

    #[test]
    fn test_counter_handles_share_state() {
        let registry = MetricsRegistry::new();
        registry.counter("like_adds").increment();
        registry.counter("like_adds").add(2);
        assert_eq!(registry.counter("like_adds").value(), 3);
    }

    #[test]
    fn test_rate() {
        let registry = MetricsRegistry::new();
        let rate = registry.rate("login_success_rate");
        assert_eq!(rate.rate(), 0.0);

        rate.add(true);
        rate.add(true);
        rate.add(false);
        rate.add(true);
        assert_eq!(rate.passes(), 3);
        assert_eq!(rate.total(), 4);
        assert!((rate.rate() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_trend_stats() {
        let trend = Trend::new();
        for value in 1..=100 {
            trend.add(value as f64);
        }

        let stats = trend.stats();
        assert_eq!(stats.count, 100);
        assert!((stats.min - 1.0).abs() < 0.01);
        assert!((stats.max - 100.0).abs() < 0.1);
        assert!((stats.avg - 50.5).abs() < 0.1);
        assert!((stats.p95 - 95.0).abs() < 0.1);
        assert!((stats.med - 50.0).abs() < 0.1);
    }

    #[test]
    fn test_empty_trend_stats() {
        assert_eq!(Trend::new().stats(), TrendStats::default());
    }

    #[test]
    fn test_snapshot_contains_every_kind() {
        let registry = MetricsRegistry::new();
        registry.counter("http_reqs").add(10);
        registry.rate("http_req_failed").add(false);
        registry.trend("http_req_duration").add(12.5);

        let snapshot = registry.snapshot(Duration::from_secs(5));
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot["http_reqs"],
            MetricSnapshot::Counter {
                count: 10,
                rate: 2.0
            }
        );
        assert_eq!(
            snapshot["http_req_failed"],
            MetricSnapshot::Rate {
                rate: 0.0,
                passes: 0,
                fails: 1
            }
        );
        assert!(matches!(
            snapshot["http_req_duration"],
            MetricSnapshot::Trend(TrendStats { count: 1, .. })
        ));
    }

    #[test]
    fn test_concurrent_recording() {
        let registry = MetricsRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        registry.counter("iterations").increment();
                        registry.trend("iteration_duration").add(i as f64);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.counter("iterations").value(), 8000);
        assert_eq!(registry.trend("iteration_duration").count(), 8000);
    }
}
