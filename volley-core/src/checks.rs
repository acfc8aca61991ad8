//! Named boolean assertions recorded per call

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::metrics::{MetricsRegistry, Rate};

/// Global rate every check feeds into
pub const CHECKS_METRIC: &str = "checks";

/// Records named checks. A failed check is data, never an error.
#[derive(Debug, Clone)]
pub struct Checks {
    overall: Rate,
    by_name: Arc<RwLock<BTreeMap<String, Rate>>>,
}

/// Pass/fail tally of one named check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub passes: u64,
    pub fails: u64,
}

impl Checks {
    pub fn new(registry: &MetricsRegistry) -> Self {
        Self {
            overall: registry.rate(CHECKS_METRIC),
            by_name: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Record `passed` under `name` and return it unchanged
    pub fn check(&self, name: &str, passed: bool) -> bool {
        self.overall.add(passed);

        let existing = self.by_name.read().get(name).cloned();
        let rate = match existing {
            Some(rate) => rate,
            None => self
                .by_name
                .write()
                .entry(name.to_string())
                .or_default()
                .clone(),
        };
        rate.add(passed);

        passed
    }

    /// Record several checks; true only if all passed
    pub fn check_all<'a>(&self, checks: impl IntoIterator<Item = (&'a str, bool)>) -> bool {
        checks
            .into_iter()
            .fold(true, |all, (name, passed)| self.check(name, passed) && all)
    }

    pub fn results(&self) -> BTreeMap<String, CheckResult> {
        self.by_name
            .read()
            .iter()
            .map(|(name, rate)| {
                (
                    name.clone(),
                    CheckResult {
                        passes: rate.passes(),
                        fails: rate.fails(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks_feed_global_rate() {
        let registry = MetricsRegistry::new();
        let checks = Checks::new(&registry);

        assert!(checks.check("status is 200", true));
        assert!(!checks.check("status is 200", false));
        assert!(checks.check("has like status", true));

        assert_eq!(registry.rate(CHECKS_METRIC).total(), 3);
        assert_eq!(registry.rate(CHECKS_METRIC).passes(), 2);

        let results = checks.results();
        assert_eq!(results["status is 200"], CheckResult { passes: 1, fails: 1 });
        assert_eq!(results["has like status"], CheckResult { passes: 1, fails: 0 });
    }

    #[test]
    fn test_check_all_records_every_check() {
        let registry = MetricsRegistry::new();
        let checks = Checks::new(&registry);

        let passed = checks.check_all([("a", false), ("b", true), ("c", true)]);
        assert!(!passed);
        assert_eq!(checks.results().len(), 3);
    }
}
