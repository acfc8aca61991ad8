//! Logging initialization for volley
//!
//! Every crate logs through `tracing` (or `log`, which tracing-subscriber
//! picks up); this crate only installs the global subscriber.

pub mod init;

pub use init::{build_filter, init_logging, init_simple_tracing};
