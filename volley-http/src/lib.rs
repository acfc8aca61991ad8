//! Load client for volley
//!
//! Wraps a shared reqwest client with the base URL of the backend under
//! test, bearer authentication and the built-in request metrics
//! (`http_reqs`, `http_req_duration`, `http_req_failed`).

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-export main types for convenience
pub use auth::{access_token_of, Authenticator};
pub use client::{LoadClient, HTTP_REQS, HTTP_REQ_DURATION, HTTP_REQ_FAILED};
pub use config::HttpConfig;
pub use errors::HttpError;
pub use types::{
    parse_envelope, tagged_metric, HttpMethod, HttpResponse, RequestSpec, RETRYABLE_STATUSES,
};
