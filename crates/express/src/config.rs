//! Configuration
//!
//! JSON on disk, every field optional. Environment variables (and a `.env`
//! file) override the back-end location and the log level.

use crate::fee::DEFAULT_GAS_LIMIT;
use crate::logging::LoggingConfig;
use express_error::{ExpressError, Result};
use express_provider::{ApiClientConfig, HttpClientConfig, RateLimitConfig};
use express_resilience::{BackoffConfig, TimeoutConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Overrides the API base URL
pub const ENV_API_URL: &str = "EXPRESS_API_URL";
/// Overrides the API key
pub const ENV_API_KEY: &str = "EXPRESS_API_KEY";
/// Overrides the log filter
pub const ENV_LOG_LEVEL: &str = "EXPRESS_LOG_LEVEL";

/// Back-end connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the Express back-end
    pub base_url: String,
    /// API key, if the back-end requires one
    pub api_key: Option<String>,
    /// Client-side rate limit, `null` to disable
    pub rate_limit: Option<RateLimitConfig>,
    /// HTTP connection settings
    pub http: HttpClientConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://express.example.com/v1/".to_string(),
            api_key: None,
            rate_limit: Some(RateLimitConfig::default()),
            http: HttpClientConfig::default(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressConfig {
    /// Back-end connection
    pub api: ApiConfig,
    /// Per-call timeouts
    pub timeouts: TimeoutConfig,
    /// Retry settings for HTTP calls
    pub retry: BackoffConfig,
    /// Gas limit for DEX quotes without an estimate
    pub default_gas_limit: u64,
    /// Manager command queue size
    pub command_buffer: usize,
    /// Logging
    pub logging: LoggingConfig,
}

impl Default for ExpressConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            timeouts: TimeoutConfig::default(),
            retry: BackoffConfig::default(),
            default_gas_limit: DEFAULT_GAS_LIMIT,
            command_buffer: 32,
            logging: LoggingConfig::default(),
        }
    }
}

impl ExpressConfig {
    /// Reads `path`; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| ExpressError::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`load`](Self::load), then applies `.env` and environment overrides
    pub fn load_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Applies overrides from the process environment and `.env`
    pub fn apply_env_overrides(&mut self) {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, keyed by the `ENV_*` names
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api.api_key = Some(key).filter(|key| !key.is_empty());
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
    }

    /// Checks the URL, timeouts, retry settings and queue size
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api.base_url)
            .map_err(|e| ExpressError::Config(format!("invalid api url {}: {}", self.api.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExpressError::Config(format!("unsupported url scheme: {}", url.scheme())));
        }
        if self.command_buffer == 0 {
            return Err(ExpressError::Config("command_buffer must be non-zero".into()));
        }
        self.timeouts.validate()?;
        self.api_client_config().validate()
    }

    /// Client settings for [`express_provider::ExpressApiClient`]
    pub fn api_client_config(&self) -> ApiClientConfig {
        let mut config = ApiClientConfig::new(self.api.base_url.clone())
            .with_rate_limit(self.api.rate_limit.clone())
            .with_backoff(self.retry.clone());
        config.http = self.api.http.clone();
        config.api_key = self.api.api_key.clone();
        config
    }
}
