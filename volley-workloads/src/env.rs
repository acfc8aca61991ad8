//! Everything a workload needs from the surrounding run

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;
use volley_config::{RunConfig, TargetConfig, VolleyConfig};
use volley_core::{Checks, MetricsRegistry};
use volley_http::{Authenticator, HttpError, LoadClient};

use crate::error::WorkloadResult;
use crate::pacing::Pacing;

/// Shared handles and settings passed to every workload constructor
#[derive(Clone)]
pub struct WorkloadEnv {
    pub registry: MetricsRegistry,
    pub checks: Checks,
    pub session: Session,
    pub target: TargetConfig,
    pub run: RunConfig,
    pub pacing: Pacing,
}

impl WorkloadEnv {
    pub fn new(
        config: &VolleyConfig,
        registry: &MetricsRegistry,
        checks: &Checks,
    ) -> WorkloadResult<Self> {
        let client = LoadClient::new(config.http.clone().into(), &config.target.base_url, registry)?;
        let pacing = Pacing::new(config.run.param_or("THINK_TIME_SCALE", 1.0)?);

        Ok(Self {
            registry: registry.clone(),
            checks: checks.clone(),
            session: Session::new(client, Authenticator::from_target(&config.target)),
            target: config.target.clone(),
            run: config.run.clone(),
            pacing,
        })
    }

    /// Workload parameter in milliseconds
    pub fn param_ms(&self, key: &str, default_ms: u64) -> WorkloadResult<Duration> {
        Ok(Duration::from_millis(self.run.param_or(key, default_ms)?))
    }
}

/// Load client plus the bearer token resolved at setup
#[derive(Clone)]
pub struct Session {
    base: LoadClient,
    authenticator: Authenticator,
    authenticated: Arc<OnceCell<LoadClient>>,
}

impl Session {
    pub fn new(base: LoadClient, authenticator: Authenticator) -> Self {
        Self {
            base,
            authenticator,
            authenticated: Arc::new(OnceCell::new()),
        }
    }

    /// Resolve the bearer token once; later calls reuse it
    pub async fn authenticate(&self) -> Result<&LoadClient, HttpError> {
        self.authenticated
            .get_or_try_init(|| async {
                let token = self.authenticator.resolve(&self.base).await?;
                debug!(
                    "Session authenticated via {:?} mode, token present: {}",
                    self.authenticator.mode(),
                    token.is_some()
                );
                Ok::<_, HttpError>(self.base.clone().with_bearer_token(token))
            })
            .await
    }

    /// Authenticated client once set up, the bare client before
    pub fn client(&self) -> &LoadClient {
        self.authenticated.get().unwrap_or(&self.base)
    }
}
