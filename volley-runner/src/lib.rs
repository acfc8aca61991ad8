//! Virtual-user execution engine for volley
//!
//! Drives a [`Workload`] through one [`volley_core::WorkloadProfile`] with
//! the constant-VU, ramping-VU or ramping-arrival-rate model, then turns the
//! shared metrics into a [`volley_core::RunSummary`].

pub mod error;
pub mod report;
pub mod runner;
pub mod shutdown;
pub mod workload;

// Re-export main types
pub use error::{RunnerError, RunnerResult};
pub use report::RunReport;
pub use runner::{Runner, RunnerConfig};
pub use shutdown::{StopHandle, StopListener, StopReason};
pub use workload::{VuContext, Workload};
