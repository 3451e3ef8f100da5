//! HTTP client for the Express back-end
//!
//! One pooled reqwest client shared by every HTTP provider and the
//! on-ramp repository, with optional rate limiting and retries.

use express_error::{ExpressError, Result};
use express_resilience::{with_backoff, BackoffConfig, HttpRetryClassifier};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "api-key";

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for the HTTP client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
    /// Idle connection timeout
    pub pool_idle_timeout_secs: u64,
    /// Connection timeout
    pub connect_timeout_secs: u64,
    /// Request timeout
    pub request_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Enable gzip compression
    pub gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 10,
            pool_idle_timeout_secs: 90,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: format!("Express/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
        }
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Burst size (max requests in a burst)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 20,
        }
    }
}

/// Everything needed to talk to the Express back-end
#[derive(Debug, Clone, PartialEq)]
pub struct ApiClientConfig {
    /// Base URL, e.g. `https://express.example.com/v1`
    pub base_url: String,
    /// API key sent in [`API_KEY_HEADER`]
    pub api_key: Option<String>,
    /// Connection settings
    pub http: HttpClientConfig,
    /// Client-side rate limit, `None` to disable
    pub rate_limit: Option<RateLimitConfig>,
    /// Retry settings for retryable failures
    pub backoff: BackoffConfig,
}

impl ApiClientConfig {
    /// Creates a config for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            http: HttpClientConfig::default(),
            rate_limit: Some(RateLimitConfig::default()),
            backoff: BackoffConfig::default(),
        }
    }

    /// Sets the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the request timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.http.request_timeout_secs = secs;
        self
    }

    /// Sets or disables the rate limit
    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimitConfig>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Sets the retry settings
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ExpressError::Config(format!("invalid base url {}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExpressError::Config(format!(
                "unsupported url scheme: {}",
                url.scheme()
            )));
        }
        if let Some(rate_limit) = &self.rate_limit {
            if rate_limit.requests_per_second == 0 || rate_limit.burst_size == 0 {
                return Err(ExpressError::Config("rate limit values must be non-zero".into()));
            }
        }
        self.backoff.validate()
    }
}

// ============================================================================
// Wire error body
// ============================================================================

/// Error body returned by the back-end on 4xx
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Back-end error code
    #[serde(default)]
    pub code: Option<i64>,
    /// Human readable description
    #[serde(default, alias = "message")]
    pub description: Option<String>,
    /// Minimum accepted amount (smallest units)
    #[serde(default)]
    pub min_amount: Option<String>,
    /// Maximum accepted amount (smallest units)
    #[serde(default)]
    pub max_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

impl ApiErrorBody {
    /// Parses either `{"error": {...}}` or a bare error object
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<ApiErrorEnvelope>(body)
            .map(|envelope| envelope.error)
            .or_else(|_| serde_json::from_str::<ApiErrorBody>(body))
            .ok()
    }

    /// Amount restriction carried by the body, if any
    pub fn amount_restriction(&self) -> Option<ExpressError> {
        if let Some(minimum) = self.min_amount.as_deref().and_then(|v| v.parse().ok()) {
            return Some(ExpressError::AmountTooSmall { minimum });
        }
        if let Some(maximum) = self.max_amount.as_deref().and_then(|v| v.parse().ok()) {
            return Some(ExpressError::AmountTooBig { maximum });
        }
        None
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client with connection pooling, rate limiting and retries
pub struct ExpressApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    backoff: BackoffConfig,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    request_count: AtomicU64,
}

impl ExpressApiClient {
    /// Creates a client from a validated configuration
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        config.validate()?;

        let http = &config.http;
        let client = Client::builder()
            .pool_max_idle_per_host(http.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(http.pool_idle_timeout_secs))
            .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .user_agent(&http.user_agent)
            .gzip(http.gzip)
            .build()
            .map_err(|e| ExpressError::NetworkError(e.to_string()))?;

        let rate_limiter = match &config.rate_limit {
            Some(limit) => {
                let per_second = NonZeroU32::new(limit.requests_per_second)
                    .ok_or_else(|| ExpressError::Config("requests_per_second is zero".into()))?;
                let burst = NonZeroU32::new(limit.burst_size)
                    .ok_or_else(|| ExpressError::Config("burst_size is zero".into()))?;
                Some(RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst)))
            }
            None => None,
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            backoff: config.backoff,
            rate_limiter,
            request_count: AtomicU64::new(0),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of HTTP requests sent, retries included
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// GET `{base}/{path}` with query parameters
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        with_backoff(&self.backoff, path, move || async move {
            let request = self.request(Method::GET, path).query(query);
            self.send(request, path).await
        })
        .await
    }

    /// POST `{base}/{path}` with a JSON body
    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        with_backoff(&self.backoff, path, move || async move {
            let request = self.request(Method::POST, path).json(body);
            self.send(request, path).await
        })
        .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, operation: &str) -> Result<T> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        self.request_count.fetch_add(1, Ordering::SeqCst);
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, operation))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, operation).await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, operation))?;
        serde_json::from_slice(&body).map_err(ExpressError::from)
    }
}

impl std::fmt::Debug for ExpressApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressApiClient")
            .field("base_url", &self.base_url)
            .field("request_count", &self.request_count())
            .field("has_api_key", &self.api_key.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish()
    }
}

fn transport_error(error: reqwest::Error, operation: &str) -> ExpressError {
    if error.is_timeout() {
        ExpressError::Timeout {
            operation: operation.to_string(),
            millis: 0,
        }
    } else if error.is_decode() {
        ExpressError::Json(error.to_string())
    } else {
        ExpressError::NetworkError(error.to_string())
    }
}

async fn error_from_response(response: Response, operation: &str) -> ExpressError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = response.text().await.unwrap_or_default();
    let body = ApiErrorBody::parse(&text);

    if let Some(restriction) = body.as_ref().and_then(ApiErrorBody::amount_restriction) {
        return restriction;
    }

    let message = body
        .and_then(|b| b.description)
        .unwrap_or_else(|| text.chars().take(200).collect());

    debug!(operation, status, message = %message, "express api error");
    HttpRetryClassifier::classify(status, retry_after.as_deref(), message, operation)
}
