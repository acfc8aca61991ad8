//! Load client tests against a mock backend

use serde_json::json;
use volley_config::{AuthMode, TargetConfig};
use volley_core::{BodyState, MetricSnapshot, MetricsRegistry};
use volley_http::*;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, registry: &MetricsRegistry) -> LoadClient {
    LoadClient::new(HttpConfig::default(), &server.uri(), registry).unwrap()
}

#[tokio::test]
async fn test_request_sends_bearer_token_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/likes"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({"targetType": "PROJECT", "targetId": 3, "action": "TOGGLE"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"isLiked": true}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = MetricsRegistry::new();
    let client = client_for(&mock_server, &registry).with_bearer_token(Some("test-token".into()));

    let response = client
        .request(
            RequestSpec::post("/api/v1/likes")
                .json(json!({"targetType": "PROJECT", "targetId": 3, "action": "TOGGLE"}))
                .tag("toggle"),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.envelope(), BodyState::Data(json!({"isLiked": true})));
    assert_eq!(response.endpoint.as_deref(), Some("toggle"));
}

#[tokio::test]
async fn test_builtin_and_tagged_metrics() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/projects/1/comments/7"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let registry = MetricsRegistry::new();
    let client = client_for(&mock_server, &registry);

    let failed = client
        .request(RequestSpec::put("/api/v1/projects/1/comments/7").tag("modify"))
        .await
        .unwrap();
    assert_eq!(failed.status, 503);
    assert!(failed.is_failed());

    client.request(RequestSpec::get("/health")).await.unwrap();

    assert_eq!(registry.counter(HTTP_REQS).value(), 2);
    assert_eq!(registry.trend(HTTP_REQ_DURATION).count(), 2);
    assert_eq!(registry.rate(HTTP_REQ_FAILED).total(), 2);
    assert_eq!(registry.rate(HTTP_REQ_FAILED).passes(), 1);

    let tagged = tagged_metric(HTTP_REQ_FAILED, "modify");
    assert_eq!(registry.rate(&tagged).passes(), 1);
    assert_eq!(registry.rate(&tagged).total(), 1);
    assert_eq!(
        registry
            .trend(&tagged_metric(HTTP_REQ_DURATION, "modify"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_transport_failure_is_status_zero() {
    // Bind and release a port so nothing listens on it
    let address = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let registry = MetricsRegistry::new();
    let client =
        LoadClient::new(HttpConfig::default(), &format!("http://{}", address), &registry).unwrap();

    let response = client.request(RequestSpec::get("/health")).await.unwrap();
    assert_eq!(response.status, 0);
    assert!(response.is_transport_error());
    assert!(response.error.is_some());
    assert_eq!(response.envelope(), BodyState::Empty);

    match registry.snapshot_of(HTTP_REQ_FAILED, std::time::Duration::from_secs(1)) {
        Some(MetricSnapshot::Rate { passes, fails, .. }) => {
            assert_eq!(passes, 1);
            assert_eq!(fails, 0);
        }
        other => panic!("unexpected snapshot: {:?}", other),
    }
}

#[tokio::test]
async fn test_query_and_custom_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/projects/search"))
        .and(query_param("query", "머신러닝"))
        .and(query_param("size", "20"))
        .and(header("x-real-ip", "192.168.1.100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"content": []}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = MetricsRegistry::new();
    let client = client_for(&mock_server, &registry);

    let response = client
        .request(
            RequestSpec::get("/api/v1/projects/search")
                .query("query", "머신러닝")
                .query("size", 20)
                .header("X-Real-IP", "192.168.1.100"),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_login_mode_resolves_issued_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({"email": "user1@example.com", "password": "Passw0rd!"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"accessToken": "issued"}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let target = TargetConfig {
        base_url: mock_server.uri(),
        auth_mode: AuthMode::Login,
        access_token: Some("fallback".to_string()),
        email: Some("user1@example.com".to_string()),
        password: Some("Passw0rd!".to_string()),
        ..TargetConfig::default()
    };

    let registry = MetricsRegistry::new();
    let client = client_for(&mock_server, &registry);
    let token = Authenticator::from_target(&target)
        .resolve(&client)
        .await
        .unwrap();

    assert_eq!(token.as_deref(), Some("issued"));
    assert_eq!(
        registry
            .trend(&tagged_metric(HTTP_REQ_DURATION, "login"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_failed_login_falls_back_to_configured_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&mock_server)
        .await;

    let target = TargetConfig {
        base_url: mock_server.uri(),
        auth_mode: AuthMode::Login,
        access_token: Some("fallback".to_string()),
        email: Some("user1@example.com".to_string()),
        password: Some("wrong".to_string()),
        ..TargetConfig::default()
    };

    let client = client_for(&mock_server, &MetricsRegistry::new());
    let token = Authenticator::from_target(&target)
        .resolve(&client)
        .await
        .unwrap();

    assert_eq!(token.as_deref(), Some("fallback"));
}
