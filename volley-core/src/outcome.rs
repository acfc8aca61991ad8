//! Outcome classification for a single simulated call

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of outcome derived from a response status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    ServerError,
    Unclassified,
}

impl OutcomeKind {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeKind::Success)
    }

    /// Name of the global counter that tracks this failure kind
    pub fn error_counter(&self) -> Option<&'static str> {
        match self {
            OutcomeKind::Success => None,
            OutcomeKind::Validation => Some("validation_errors"),
            OutcomeKind::Unauthorized => Some("unauthorized_errors"),
            OutcomeKind::Forbidden => Some("forbidden_errors"),
            OutcomeKind::NotFound => Some("not_found_errors"),
            OutcomeKind::Conflict => Some("conflict_errors"),
            OutcomeKind::RateLimited => Some("rate_limit_errors"),
            OutcomeKind::ServerError => Some("server_errors"),
            OutcomeKind::Unclassified => Some("unclassified_errors"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Validation => "validation",
            OutcomeKind::Unauthorized => "unauthorized",
            OutcomeKind::Forbidden => "forbidden",
            OutcomeKind::NotFound => "not_found",
            OutcomeKind::Conflict => "conflict",
            OutcomeKind::RateLimited => "rate_limited",
            OutcomeKind::ServerError => "server_error",
            OutcomeKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which status codes count as success for an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPolicy {
    /// Only the listed codes
    Codes(Vec<u16>),
    /// Any 2xx code
    Any2xx,
}

impl Default for SuccessPolicy {
    fn default() -> Self {
        SuccessPolicy::Codes(vec![200, 201])
    }
}

impl SuccessPolicy {
    pub fn ok_only() -> Self {
        SuccessPolicy::Codes(vec![200])
    }

    pub fn created() -> Self {
        SuccessPolicy::Codes(vec![201])
    }

    pub fn any_2xx() -> Self {
        SuccessPolicy::Any2xx
    }

    pub fn accepts(&self, status: u16) -> bool {
        match self {
            SuccessPolicy::Codes(codes) => codes.contains(&status),
            SuccessPolicy::Any2xx => (200..300).contains(&status),
        }
    }
}

/// Classify a status code. Status `0` stands for a transport failure.
pub fn classify(status: u16, policy: &SuccessPolicy) -> OutcomeKind {
    if policy.accepts(status) {
        return OutcomeKind::Success;
    }

    match status {
        400 | 422 => OutcomeKind::Validation,
        401 => OutcomeKind::Unauthorized,
        403 => OutcomeKind::Forbidden,
        404 => OutcomeKind::NotFound,
        409 => OutcomeKind::Conflict,
        429 => OutcomeKind::RateLimited,
        s if s >= 500 => OutcomeKind::ServerError,
        _ => OutcomeKind::Unclassified,
    }
}

/// One measured round trip and its classification. Never retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedOutcome {
    pub duration_ms: f64,
    pub status: u16,
    pub kind: OutcomeKind,
    pub success: bool,
}

impl ObservedOutcome {
    pub fn new(duration_ms: f64, status: u16, policy: &SuccessPolicy) -> Self {
        let kind = classify(status, policy);
        Self {
            duration_ms,
            status,
            kind,
            success: kind.is_success(),
        }
    }

    /// Downgrade to an unclassified failure, e.g. when the body is unusable
    pub fn unclassified(mut self) -> Self {
        self.kind = OutcomeKind::Unclassified;
        self.success = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes() {
        let policy = SuccessPolicy::default();
        assert_eq!(classify(200, &policy), OutcomeKind::Success);
        assert_eq!(classify(201, &policy), OutcomeKind::Success);
        assert_eq!(classify(204, &policy), OutcomeKind::Unclassified);
    }

    #[test]
    fn test_failure_taxonomy() {
        let policy = SuccessPolicy::default();
        assert_eq!(classify(400, &policy), OutcomeKind::Validation);
        assert_eq!(classify(422, &policy), OutcomeKind::Validation);
        assert_eq!(classify(401, &policy), OutcomeKind::Unauthorized);
        assert_eq!(classify(403, &policy), OutcomeKind::Forbidden);
        assert_eq!(classify(404, &policy), OutcomeKind::NotFound);
        assert_eq!(classify(409, &policy), OutcomeKind::Conflict);
        assert_eq!(classify(429, &policy), OutcomeKind::RateLimited);
        assert_eq!(classify(500, &policy), OutcomeKind::ServerError);
        assert_eq!(classify(503, &policy), OutcomeKind::ServerError);
        assert_eq!(classify(599, &policy), OutcomeKind::ServerError);
        assert_eq!(classify(0, &policy), OutcomeKind::Unclassified);
        assert_eq!(classify(302, &policy), OutcomeKind::Unclassified);
        assert_eq!(classify(418, &policy), OutcomeKind::Unclassified);
    }

    #[test]
    fn test_policy_variants() {
        assert_eq!(classify(201, &SuccessPolicy::ok_only()), OutcomeKind::Unclassified);
        assert_eq!(classify(200, &SuccessPolicy::created()), OutcomeKind::Unclassified);
        assert_eq!(classify(204, &SuccessPolicy::any_2xx()), OutcomeKind::Success);
    }

    #[test]
    fn test_success_takes_priority() {
        // An operation may declare an unusual success code
        let policy = SuccessPolicy::Codes(vec![409]);
        assert_eq!(classify(409, &policy), OutcomeKind::Success);
    }

    #[test]
    fn test_classification_is_pure() {
        let policy = SuccessPolicy::default();
        for status in [0u16, 200, 201, 400, 401, 403, 404, 409, 422, 429, 500, 502] {
            assert_eq!(classify(status, &policy), classify(status, &policy));
            assert_eq!(
                ObservedOutcome::new(12.5, status, &policy),
                ObservedOutcome::new(12.5, status, &policy)
            );
        }
    }

    #[test]
    fn test_unclassified_downgrade() {
        let outcome = ObservedOutcome::new(10.0, 200, &SuccessPolicy::default()).unclassified();
        assert_eq!(outcome.kind, OutcomeKind::Unclassified);
        assert!(!outcome.success);
    }
}
