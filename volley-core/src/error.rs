//! Core error types for volley

use thiserror::Error;

/// Result type alias for volley-core
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building plans, breakdowns and thresholds
#[derive(Debug, Error)]
pub enum CoreError {
    /// The selected scenario name matched none of the workload's profiles
    #[error("Unknown scenario '{requested}'. Available scenarios: {}", available.join(", "))]
    UnknownScenario {
        requested: String,
        available: Vec<String>,
    },

    /// The plan held more than one profile where exactly one was expected
    #[error("Execution plan holds {0} profiles, expected exactly one")]
    AmbiguousPlan(usize),

    /// A workload profile is internally inconsistent
    #[error("Invalid profile '{name}': {message}")]
    InvalidProfile { name: String, message: String },

    /// A derived phase breakdown does not describe a fraction of the total
    #[error("Invalid phase breakdown: {0}")]
    InvalidBreakdown(String),

    /// A threshold expression could not be parsed
    #[error("Invalid threshold expression '{expression}': {reason}")]
    InvalidThreshold { expression: String, reason: String },

    /// Summary serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
