//! Built-in workloads for volley
//!
//! Each workload pairs a profile table with the iteration it runs against the
//! backend: login under rate limiting, like toggles on hot targets, comment
//! edit bursts, concurrent edits of one comment and project search.
//! [`catalog`] lists them and builds them from a [`WorkloadEnv`].

pub mod auth_rate_limit;
pub mod catalog;
pub mod comment_burst;
pub mod comment_contention;
pub mod env;
pub mod error;
pub mod like_toggle;
pub mod pacing;
pub mod project_search;

mod profiles;

pub use catalog::{catalog, find, CatalogEntry};
pub use env::{Session, WorkloadEnv};
pub use error::{WorkloadError, WorkloadResult};
pub use pacing::Pacing;
