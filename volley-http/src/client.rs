//! Load client implementation

use crate::config::HttpConfig;
use crate::errors::HttpError;
use crate::types::{tagged_metric, HttpResponse, RequestSpec};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CACHE_CONTROL, EXPIRES, PRAGMA},
    Client,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};
use url::Url;
use volley_core::{Counter, MetricsRegistry, Rate, Trend};

/// Built-in request metrics
pub const HTTP_REQS: &str = "http_reqs";
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";

#[derive(Debug, Clone)]
struct RequestMetrics {
    registry: MetricsRegistry,
    reqs: Counter,
    duration: Trend,
    failed: Rate,
}

impl RequestMetrics {
    fn new(registry: &MetricsRegistry) -> Self {
        Self {
            reqs: registry.counter(HTTP_REQS),
            duration: registry.trend(HTTP_REQ_DURATION),
            failed: registry.rate(HTTP_REQ_FAILED),
            registry: registry.clone(),
        }
    }

    fn record(&self, response: &HttpResponse) {
        let duration_ms = response.duration_ms();
        let failed = response.is_failed();

        self.reqs.increment();
        self.duration.add(duration_ms);
        self.failed.add(failed);

        if let Some(endpoint) = &response.endpoint {
            self.registry
                .trend(&tagged_metric(HTTP_REQ_DURATION, endpoint))
                .add(duration_ms);
            self.registry
                .rate(&tagged_metric(HTTP_REQ_FAILED, endpoint))
                .add(failed);
        }
    }
}

/// HTTP client shared by every virtual user of a run.
///
/// Cloning is cheap; clones share the connection pool and metrics.
#[derive(Debug, Clone)]
pub struct LoadClient {
    client: Client,
    base_url: Arc<str>,
    bearer_token: Option<Arc<str>>,
    disable_cache: bool,
    metrics: RequestMetrics,
}

impl LoadClient {
    /// Build a client for `base_url` that records into `registry`
    pub fn new(
        config: HttpConfig,
        base_url: &str,
        registry: &MetricsRegistry,
    ) -> Result<Self, HttpError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(HttpError::InvalidUrl(base_url.to_string()));
        }

        debug!(
            "Creating load client for {} with {}s timeout",
            base_url,
            config.timeout.as_secs()
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .redirect(reqwest::redirect::Policy::limited(
                config.max_redirects as usize,
            ))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            bearer_token: None,
            disable_cache: config.disable_cache,
            metrics: RequestMetrics::new(registry),
        })
    }

    /// Attach `token` as the bearer token of authenticated requests
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.map(Arc::from);
        self
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path` plus query parameters
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, HttpError> {
        let raw = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };

        let mut url =
            Url::parse(&raw).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn headers_for(&self, spec: &RequestSpec) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if self.disable_cache {
            headers.insert(
                CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate"),
            );
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(EXPIRES, HeaderValue::from_static("0"));
        }

        for (name, value) in &spec.headers {
            let header_name =
                HeaderName::from_str(name).map_err(|_| HttpError::InvalidHeaderName(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| HttpError::InvalidHeaderValue(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    /// Send one request and record the built-in metrics.
    ///
    /// Transport failures come back as a status `0` response. Only a request
    /// that cannot be built returns an error.
    pub async fn request(&self, spec: RequestSpec) -> Result<HttpResponse, HttpError> {
        let url = self.url_for(&spec.path, &spec.query)?;
        let headers = self.headers_for(&spec)?;

        let mut request = self
            .client
            .request(reqwest::Method::from(spec.method), url)
            .headers(headers);

        if spec.authenticated {
            if let Some(token) = &self.bearer_token {
                request = request.bearer_auth(token);
            }
        }

        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        trace!("Sending {} {}", spec.method, spec.path);
        let start = Instant::now();

        let response = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => HttpResponse {
                        status,
                        body,
                        elapsed: start.elapsed(),
                        endpoint: spec.endpoint,
                        error: None,
                    },
                    Err(e) => {
                        warn!("Failed to read body of {} {}: {}", spec.method, spec.path, e);
                        HttpResponse {
                            status,
                            body: String::new(),
                            elapsed: start.elapsed(),
                            endpoint: spec.endpoint,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
            Err(e) => {
                debug!("{} {} failed on the wire: {}", spec.method, spec.path, e);
                HttpResponse::transport_failure(start.elapsed(), spec.endpoint, e.to_string())
            }
        };

        trace!(
            "{} {} -> {} in {:.1}ms",
            spec.method,
            spec.path,
            response.status,
            response.duration_ms()
        );

        self.metrics.record(&response);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> LoadClient {
        LoadClient::new(HttpConfig::default(), base_url, &MetricsRegistry::new()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let registry = MetricsRegistry::new();
        assert!(matches!(
            LoadClient::new(HttpConfig::default(), "localhost:8080/api", &registry),
            Err(HttpError::InvalidUrl(_))
        ));
        assert!(LoadClient::new(HttpConfig::default(), "not a url", &registry).is_err());
    }

    #[test]
    fn test_url_joining_keeps_base_path() {
        let client = client("http://backend.internal:8080/gateway/");
        let url = client.url_for("/api/v1/likes", &[]).unwrap();
        assert_eq!(url.as_str(), "http://backend.internal:8080/gateway/api/v1/likes");

        let url = client.url_for("health", &[]).unwrap();
        assert_eq!(url.as_str(), "http://backend.internal:8080/gateway/health");
    }

    #[test]
    fn test_query_is_encoded() {
        let client = client("http://localhost:8080");
        let url = client
            .url_for(
                "/api/v1/projects/search",
                &[
                    ("query".to_string(), "웹 개발".to_string()),
                    ("page".to_string(), "2".to_string()),
                ],
            )
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("query".to_string(), "웹 개발".to_string()));
        assert_eq!(pairs[1], ("page".to_string(), "2".to_string()));
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_invalid_header_is_an_error() {
        let client = client("http://localhost:8080");
        let spec = RequestSpec::get("/").header("bad header", "x");
        assert!(matches!(
            client.headers_for(&spec),
            Err(HttpError::InvalidHeaderName(_))
        ));

        let spec = RequestSpec::get("/").header("X-Note", "line\nbreak");
        assert!(matches!(
            client.headers_for(&spec),
            Err(HttpError::InvalidHeaderValue(_))
        ));
    }

    #[test]
    fn test_no_cache_headers() {
        let registry = MetricsRegistry::new();
        let config = HttpConfig {
            disable_cache: true,
            ..HttpConfig::default()
        };
        let client = LoadClient::new(config, "http://localhost:8080", &registry).unwrap();
        let headers = client.headers_for(&RequestSpec::get("/")).unwrap();
        assert_eq!(headers[PRAGMA], "no-cache");
        assert_eq!(headers[EXPIRES], "0");
    }

    #[test]
    fn test_bearer_token() {
        let client = client("http://localhost:8080").with_bearer_token(Some("abc".to_string()));
        assert_eq!(client.bearer_token(), Some("abc"));
    }
}
