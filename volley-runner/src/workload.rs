//! The seam between the runner and the workloads it drives

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use volley_core::{Threshold, WorkloadProfile};

/// Identity of the virtual user running an iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VuContext {
    /// 1-based virtual user id
    pub vu_id: u32,
    /// 0-based iteration number, per VU for VU executors and global for
    /// arrival-rate executors
    pub iteration: u64,
    /// Name of the scenario being run
    pub scenario: Arc<str>,
}

/// A scripted sequence of calls against the backend under test
#[async_trait]
pub trait Workload: Send + Sync {
    /// Catalog name, e.g. `like-toggle-hotspot`
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Every profile the workload declares, keyed by scenario name
    fn profiles(&self) -> BTreeMap<String, WorkloadProfile>;

    /// Pass/fail criteria for a run of `scenario`
    fn thresholds(&self, scenario: &str) -> Vec<Threshold>;

    /// Runs once before any virtual user starts
    async fn setup(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// One iteration of one virtual user
    async fn iteration(&self, ctx: &VuContext) -> anyhow::Result<()>;

    /// Runs once after every iteration has finished, only if setup succeeded.
    /// A failure is logged and leaves the report untouched.
    async fn teardown(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
