//! Helpers for declaring profile tables

use std::collections::BTreeMap;
use std::time::Duration;
use volley_core::{Stage, WorkloadProfile};

const TEST_TYPE_TAG: &str = "test_type";

pub(crate) fn millis(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub(crate) fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

pub(crate) fn mins(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

pub(crate) fn hours(n: u64) -> Duration {
    Duration::from_secs(n * 3600)
}

pub(crate) fn stage(duration: Duration, target: u32) -> Stage {
    Stage::new(duration, target)
}

/// Profile table keyed by scenario name. Every profile is tagged with
/// `test_type: <scenario>`.
pub(crate) fn table<const N: usize>(
    entries: [(&str, WorkloadProfile); N],
) -> BTreeMap<String, WorkloadProfile> {
    entries
        .into_iter()
        .map(|(name, profile)| (name.to_string(), profile.with_tag(TEST_TYPE_TAG, name)))
        .collect()
}

/// Pause a scenario takes after each iteration, if any
pub(crate) fn scenario_pause(scenario: &str, pauses: &[(&str, Duration)]) -> Duration {
    pauses
        .iter()
        .find(|(name, _)| *name == scenario)
        .map(|(_, pause)| *pause)
        .unwrap_or(Duration::ZERO)
}
