//! Request and response types of the load client

use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;
use volley_core::BodyState;
use volley_resilience::Retryable;

/// Status codes worth retrying: conflicts, throttling and transient server errors
pub const RETRYABLE_STATUSES: [u16; 6] = [409, 429, 500, 502, 503, 504];

/// HTTP methods the workloads issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(reqwest::Method::from(*self).as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One request against the backend under test.
///
/// `path` is joined onto the client's base URL. The `endpoint` tag, when
/// set, also files the request's timing under tagged metric names.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    pub endpoint: Option<String>,
    /// Attach the client's bearer token
    pub authenticated: bool,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            endpoint: None,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Tag the request with an endpoint name
    pub fn tag(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Send without the bearer token
    pub fn no_auth(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Ask every cache on the way to skip this request
    pub fn no_cache(self) -> Self {
        self.header("Cache-Control", "no-store, no-cache, must-revalidate")
            .header("Pragma", "no-cache")
            .header("Expires", "0")
    }
}

/// Response of one request.
///
/// A request that failed on the wire (connect error, timeout, reset) has
/// status `0`, an empty body and the transport error in `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
    pub endpoint: Option<String>,
    pub error: Option<String>,
}

impl HttpResponse {
    pub fn transport_failure(elapsed: Duration, endpoint: Option<String>, error: String) -> Self {
        Self {
            status: 0,
            body: String::new(),
            elapsed,
            endpoint,
            error: Some(error),
        }
    }

    /// Elapsed time in fractional milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    pub fn is_transport_error(&self) -> bool {
        self.status == 0
    }

    /// Whether the request counts as failed in `http_req_failed`
    pub fn is_failed(&self) -> bool {
        self.is_transport_error() || self.status >= 400
    }

    /// The `data` member of a `{ "data": ... }` envelope
    pub fn envelope(&self) -> BodyState {
        parse_envelope(&self.body)
    }
}

impl Retryable for HttpResponse {
    fn is_retryable(&self) -> bool {
        RETRYABLE_STATUSES.contains(&self.status)
    }
}

/// Parse a response body defensively into its envelope state
pub fn parse_envelope(body: &str) -> BodyState {
    if body.trim().is_empty() {
        return BodyState::Empty;
    }

    match serde_json::from_str::<JsonValue>(body) {
        Ok(JsonValue::Object(mut map)) => match map.remove("data") {
            Some(data) => BodyState::Data(data),
            None => BodyState::Malformed,
        },
        _ => BodyState::Malformed,
    }
}

/// Metric name carrying an endpoint tag, e.g. `http_req_duration{endpoint:modify}`
pub fn tagged_metric(metric: &str, endpoint: &str) -> String {
    format!("{}{{endpoint:{}}}", metric, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
            elapsed: Duration::from_millis(12),
            endpoint: None,
            error: None,
        }
    }

    #[test]
    fn test_http_method_to_reqwest() {
        assert_eq!(reqwest::Method::from(HttpMethod::Get), reqwest::Method::GET);
        assert_eq!(reqwest::Method::from(HttpMethod::Put), reqwest::Method::PUT);
        assert_eq!(reqwest::Method::from(HttpMethod::Delete), reqwest::Method::DELETE);
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }

    #[test]
    fn test_request_builder() {
        let spec = RequestSpec::get("/api/v1/projects/search")
            .query("page", 3)
            .query("query", "데이터 분석")
            .header("X-Real-IP", "192.168.1.100")
            .tag("search")
            .no_auth();

        assert_eq!(spec.method, HttpMethod::Get);
        assert_eq!(spec.query[0], ("page".to_string(), "3".to_string()));
        assert_eq!(spec.endpoint.as_deref(), Some("search"));
        assert!(!spec.authenticated);
        assert!(RequestSpec::post("/x").authenticated);
    }

    #[test]
    fn test_envelope_states() {
        assert_eq!(parse_envelope(""), BodyState::Empty);
        assert_eq!(parse_envelope("  \n"), BodyState::Empty);
        assert_eq!(parse_envelope("<html>oops</html>"), BodyState::Malformed);
        assert_eq!(parse_envelope(r#"{"message":"ok"}"#), BodyState::Malformed);
        assert_eq!(parse_envelope("[1,2]"), BodyState::Malformed);
        assert_eq!(
            parse_envelope(r#"{"data":{"isLiked":true}}"#),
            BodyState::Data(json!({"isLiked": true}))
        );
        assert_eq!(parse_envelope(r#"{"data":null}"#), BodyState::Data(JsonValue::Null));
    }

    #[test]
    fn test_failure_and_retry_classification() {
        assert!(response(0, "").is_failed());
        assert!(response(0, "").is_transport_error());
        assert!(response(404, "").is_failed());
        assert!(!response(201, "").is_failed());
        assert!(!response(204, "").is_failed());

        for status in RETRYABLE_STATUSES {
            assert!(response(status, "").is_retryable());
        }
        for status in [0, 200, 400, 401, 404, 501] {
            assert!(!response(status, "").is_retryable());
        }
    }

    #[test]
    fn test_tagged_metric_name() {
        assert_eq!(
            tagged_metric("http_req_duration", "modify"),
            "http_req_duration{endpoint:modify}"
        );
    }

    #[test]
    fn test_duration_ms() {
        assert!((response(200, "").duration_ms() - 12.0).abs() < 1e-9);
    }
}
