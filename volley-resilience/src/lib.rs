//! Resilience helpers for volley
//!
//! Workloads use these to retry calls whose outcome looks transient (lock
//! conflicts, rate limiting, gateway errors) without giving up on the
//! iteration.

pub mod backoff;
pub mod retry;

pub use backoff::DoublingBackoff;
pub use retry::{with_retry, Retryable};
