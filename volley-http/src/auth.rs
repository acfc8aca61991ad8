//! Bearer token resolution

use crate::client::LoadClient;
use crate::errors::HttpError;
use crate::types::RequestSpec;
use serde_json::json;
use tracing::{info, warn};
use volley_config::{AuthMode, TargetConfig};
use volley_core::BodyState;

/// Resolves the bearer token a run authenticates with
#[derive(Clone)]
pub struct Authenticator {
    mode: AuthMode,
    access_token: Option<String>,
    email: Option<String>,
    password: Option<String>,
    login_path: String,
}

impl Authenticator {
    pub fn from_target(target: &TargetConfig) -> Self {
        Self {
            mode: target.auth_mode,
            access_token: target.access_token.clone(),
            email: target.email.clone(),
            password: target.password.clone(),
            login_path: target.login_path.clone(),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Token to authenticate with.
    ///
    /// In login mode a failed or unparseable login falls back to the
    /// configured access token, which may itself be absent.
    pub async fn resolve(&self, client: &LoadClient) -> Result<Option<String>, HttpError> {
        if self.mode == AuthMode::Token {
            return Ok(self.access_token.clone());
        }

        let (Some(email), Some(password)) = (&self.email, &self.password) else {
            warn!("Login mode without credentials, using the configured access token");
            return Ok(self.access_token.clone());
        };

        match self.login(client, email, password).await? {
            Some(token) => {
                info!("Logged in as {}", email);
                Ok(Some(token))
            }
            None => {
                warn!("Login as {} failed, using the configured access token", email);
                Ok(self.access_token.clone())
            }
        }
    }

    /// Post credentials to the login endpoint and return the issued token
    pub async fn login(
        &self,
        client: &LoadClient,
        email: &str,
        password: &str,
    ) -> Result<Option<String>, HttpError> {
        let response = client
            .request(
                RequestSpec::post(&self.login_path)
                    .json(json!({ "email": email, "password": password }))
                    .tag("login")
                    .no_auth(),
            )
            .await?;

        if response.status != 200 {
            return Ok(None);
        }
        Ok(access_token_of(&response.envelope()))
    }
}

/// `accessToken` of a login response envelope
pub fn access_token_of(body: &BodyState) -> Option<String> {
    match body {
        BodyState::Data(data) => data
            .get("accessToken")
            .and_then(|token| token.as_str())
            .filter(|token| !token.is_empty())
            .map(str::to_string),
        _ => None,
    }
}
