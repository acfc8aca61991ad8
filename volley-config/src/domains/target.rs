//! Backend under test and how to authenticate against it

use crate::error::ConfigResult;
use crate::validation::{validate_http_url, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL every request path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// How bearer tokens are obtained
    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Pre-issued bearer token; the fallback when a login fails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Credentials for `auth_mode: login`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Path of the login endpoint
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

/// Bearer token source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Use `access_token` as is
    #[default]
    Token,
    /// Log in with `email`/`password` and use the issued token
    Login,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "token" => Ok(AuthMode::Token),
            "login" => Ok(AuthMode::Login),
            _ => Err(format!("Invalid auth mode: {}", s)),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_mode: AuthMode::Token,
            access_token: None,
            email: None,
            password: None,
            login_path: default_login_path(),
        }
    }
}

// Secrets stay out of debug output
impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("TargetConfig")
            .field("base_url", &self.base_url)
            .field("auth_mode", &self.auth_mode)
            .field("access_token", &redact(&self.access_token))
            .field("email", &self.email)
            .field("password", &redact(&self.password))
            .field("login_path", &self.login_path)
            .finish()
    }
}

impl Validatable for TargetConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_http_url(&self.base_url, "base_url", self.domain_name())?;
        validate_required_string(&self.login_path, "login_path", self.domain_name())?;

        if !self.login_path.starts_with('/') {
            return Err(self.validation_error("login_path must start with '/'"));
        }

        if self.auth_mode == AuthMode::Login && (self.email.is_none() || self.password.is_none())
        {
            return Err(self.validation_error("auth_mode 'login' requires email and password"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "target"
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_login_path() -> String {
    "/api/v1/auth/login".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_defaults() {
        let config = TargetConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.auth_mode, AuthMode::Token);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_login_mode_requires_credentials() {
        let mut config = TargetConfig {
            auth_mode: AuthMode::Login,
            ..TargetConfig::default()
        };
        assert!(config.validate().is_err());

        config.email = Some("user1@example.com".to_string());
        config.password = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = TargetConfig {
            access_token: Some("eyJhbGciOi".to_string()),
            password: Some("hunter2".to_string()),
            ..TargetConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("eyJhbGciOi"));
        assert!(!debug.contains("hunter2"));
    }
}
