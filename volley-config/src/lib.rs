//! Domain-driven configuration for volley
//!
//! Configuration is split by domain (target, http, logging, run). Values come
//! from an optional YAML file, then `VOLLEY_*` environment variables override
//! them, then every domain is validated.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    http::{ConnectionPoolConfig, HttpConfig},
    logging::{LogFormat, LogLevel, LoggingConfig},
    run::RunConfig,
    target::{AuthMode, TargetConfig},
    VolleyConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
