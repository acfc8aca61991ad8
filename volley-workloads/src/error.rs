//! Workload construction errors

use thiserror::Error;
use volley_config::ConfigError;
use volley_core::CoreError;
use volley_http::HttpError;

#[derive(Error, Debug)]
pub enum WorkloadError {
    #[error("Unknown workload '{requested}'. Available workloads: {}", available.join(", "))]
    UnknownWorkload {
        requested: String,
        available: Vec<String>,
    },

    #[error("Invalid workload parameter: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type WorkloadResult<T> = Result<T, WorkloadError>;
