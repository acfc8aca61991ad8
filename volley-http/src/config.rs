//! HTTP configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use volley_config::HttpConfig as ConfigHttpConfig;

/// Load client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Maximum number of redirects to follow
    pub max_redirects: u32,

    /// User agent string
    pub user_agent: String,

    /// Whether to verify SSL certificates
    pub verify_ssl: bool,

    /// Attach no-cache headers to every request
    pub disable_cache: bool,

    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,

    pub pool_idle_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        ConfigHttpConfig::default().into()
    }
}

impl From<ConfigHttpConfig> for HttpConfig {
    fn from(config: ConfigHttpConfig) -> Self {
        Self {
            timeout: config.timeout,
            max_redirects: config.max_redirects,
            user_agent: config.user_agent,
            verify_ssl: config.verify_ssl,
            disable_cache: config.disable_cache,
            pool_max_idle_per_host: config.connection_pool.max_idle_per_host,
            pool_idle_timeout: config.connection_pool.idle_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_domain() {
        let mut domain = ConfigHttpConfig::default();
        domain.timeout = Duration::from_secs(5);
        domain.disable_cache = true;
        domain.connection_pool.max_idle_per_host = 8;

        let config = HttpConfig::from(domain);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.disable_cache);
        assert!(config.verify_ssl);
        assert_eq!(config.pool_max_idle_per_host, 8);
        assert!(config.user_agent.starts_with("volley/"));
    }
}
