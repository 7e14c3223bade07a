//! Client configuration.

use std::time::Duration;

use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_SERVICE_URL: &str = "MOODLE_SERVICE_URL";
pub const ENV_TOKEN: &str = "MOODLE_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "MOODLE_TIMEOUT_SECS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },

    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Where the service lives, which token to present, and how long a single
/// HTTP round-trip may take.
#[derive(Clone)]
pub struct ClientConfig {
    pub service_url: Url,
    pub token: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(service_url: Url) -> Self {
        Self {
            service_url,
            token: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `MOODLE_SERVICE_URL`, `MOODLE_TOKEN` and `MOODLE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup(ENV_SERVICE_URL).ok_or(ConfigError::Missing(ENV_SERVICE_URL))?;
        let service_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            var: ENV_SERVICE_URL,
            source,
        })?;

        let mut config = Self::new(service_url);
        if let Some(token) = lookup(ENV_TOKEN) {
            config.token = token;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidTimeout {
                var: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("service_url", &self.service_url.as_str())
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
