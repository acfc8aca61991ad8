//! Integration tests for volley-config

use std::io::Write;
use std::time::Duration;
use temp_env::with_vars;
use volley_config::*;

#[test]
fn test_default_config_validation() {
    let config = VolleyConfig::default();
    assert!(config.validate_all().is_ok());
    assert_eq!(config.target.base_url, "http://localhost:8080");
    assert_eq!(config.run.scenario, "smoke");
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("VOLLEY_BASE_URL", Some("https://staging.example.com")),
        ("VOLLEY_SCENARIO", Some("load")),
        ("VOLLEY_ACCESS_TOKEN", Some("token-123")),
        ("VOLLEY_HTTP_TIMEOUT", Some("15")),
        ("VOLLEY_LOG_LEVEL", Some("debug")),
        ("VOLLEY_PARAM_MODIFY_TIMES", Some("4")),
        ("VOLLEY_PARAM_STRICT_200", Some("1")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_env().unwrap();

        assert_eq!(config.target.base_url, "https://staging.example.com");
        assert_eq!(config.target.access_token.as_deref(), Some("token-123"));
        assert_eq!(config.run.scenario, "load");
        assert_eq!(config.http.timeout, Duration::from_secs(15));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.run.param("MODIFY_TIMES"), Some("4"));
        assert!(config.run.flag("STRICT_200").unwrap());
    });
}

#[test]
fn test_invalid_env_values_are_rejected() {
    with_vars([("VOLLEY_HTTP_TIMEOUT", Some("soon"))], || {
        assert!(matches!(
            ConfigLoader::new().from_env(),
            Err(ConfigError::EnvError(_))
        ));
    });

    with_vars([("VOLLEY_AUTH_MODE", Some("oauth"))], || {
        assert!(matches!(
            ConfigLoader::new().from_env(),
            Err(ConfigError::EnvError(_))
        ));
    });

    with_vars([("VOLLEY_BASE_URL", Some("localhost"))], || {
        assert!(matches!(
            ConfigLoader::new().from_env(),
            Err(ConfigError::DomainError { .. })
        ));
    });
}

#[test]
fn test_custom_prefix() {
    with_vars([("LOADTEST_SCENARIO", Some("spike"))], || {
        let config = ConfigLoader::with_prefix("LOADTEST").from_env().unwrap();
        assert_eq!(config.run.scenario, "spike");
    });
}

#[test]
fn test_yaml_config_roundtrip() {
    let yaml = VolleyConfig::generate_sample();
    let parsed: VolleyConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
    assert_eq!(parsed.run.param("MODIFY_TIMES"), Some("3"));
}

#[test]
fn test_file_with_env_override() {
    let yaml = r#"
target:
  base_url: "http://backend.internal:8080"
  auth_mode: login
  email: "user1@example.com"
  password: "Passw0rd!"

http:
  timeout: 20
  verify_ssl: false
  disable_cache: true

logging:
  level: warn
  format: json

run:
  workload: like-toggle-hotspot
  scenario: stress
  graceful_stop: 10
  params:
    HOT_TARGET_COUNT: "5"
"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_vars([("VOLLEY_SCENARIO", Some("smoke"))], || {
        let config = ConfigLoader::new().load(Some(file.path())).unwrap();

        assert_eq!(config.target.auth_mode, AuthMode::Login);
        assert_eq!(config.http.timeout, Duration::from_secs(20));
        assert!(!config.http.verify_ssl);
        assert!(config.http.disable_cache);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.run.workload.as_deref(), Some("like-toggle-hotspot"));
        assert_eq!(config.run.graceful_stop, Duration::from_secs(10));
        assert_eq!(config.run.param("HOT_TARGET_COUNT"), Some("5"));
        // Environment wins over the file
        assert_eq!(config.run.scenario, "smoke");
    });
}

#[test]
fn test_missing_file_is_an_error() {
    let result = ConfigLoader::new().from_file("/nonexistent/volley.yaml");
    assert!(matches!(result, Err(ConfigError::FileReadError(_))));
}
