//! Nova client configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use nimbus_cache::CacheConfig;
use nimbus_core::constants::{DEFAULT_SESSION_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

/// Nova client configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NovaConfig {
    /// Pre-issued Keystone token sent as `X-Auth-Token`
    pub auth_token: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// How long extension listings stay memoized, in seconds
    pub session_interval_seconds: u64,
    /// Extra attempts when an extension listing times out
    pub timeout_retries: u32,
    /// User agent header
    pub user_agent: String,
}

impl Default for NovaConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            session_interval_seconds: DEFAULT_SESSION_INTERVAL_SECS,
            timeout_retries: 0,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl NovaConfig {
    /// Creates a config with the given token.
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            ..Default::default()
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the memoization window for discovery lookups.
    pub fn with_session_interval(mut self, seconds: u64) -> Self {
        self.session_interval_seconds = seconds;
        self
    }

    /// Cache settings for discovery lookups.
    pub fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::with_ttl_seconds(self.session_interval_seconds);
        config.timeout_retries = self.timeout_retries;
        config
    }
}

impl fmt::Debug for NovaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NovaConfig")
            .field("auth_token", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("session_interval_seconds", &self.session_interval_seconds)
            .field("timeout_retries", &self.timeout_retries)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
