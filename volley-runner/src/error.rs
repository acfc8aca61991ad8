//! Error types for run execution

use thiserror::Error;
use volley_core::CoreError;

/// Errors that stop a run from starting or from being summarized.
///
/// Failed iterations are not errors at this level; they are logged and
/// counted in `iteration_errors`.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Workload setup failed: {0:#}")]
    Setup(anyhow::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for runner operations
pub type RunnerResult<T> = Result<T, RunnerError>;
