//! # Express Provider
//!
//! Provider management and HTTP back-end clients for the Express SDK.
//!
//! ## Features
//!
//! - [`ProviderPool`]: quote providers in stable registration order
//! - [`ExpressApiClient`]: pooled HTTP client with rate limiting and retries
//! - [`HttpQuoteProvider`]: quotes and trade initiation over HTTP
//! - [`HttpOnrampRepository`]: on-ramp catalog with a TTL cache
//!
//! ## Example
//!
//! ```ignore
//! use express_provider::{ApiClientConfig, ExpressApiClient, HttpQuoteProvider, ProviderPool};
//! use express_traits::{ExpressProvider, ExpressProviderType};
//! use std::sync::Arc;
//!
//! let client = Arc::new(ExpressApiClient::new(
//!     ApiClientConfig::new("https://express.example.com/v1").with_api_key("key"),
//! )?);
//!
//! let mut pool = ProviderPool::new();
//! pool.register(Arc::new(HttpQuoteProvider::new(
//!     ExpressProvider::new("changelly", "Changelly", ExpressProviderType::Cex),
//!     client.clone(),
//! )))?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod onramp;
pub mod pool;
pub mod quote;

pub use client::{
    ApiClientConfig, ApiErrorBody, ExpressApiClient, HttpClientConfig, RateLimitConfig,
    API_KEY_HEADER,
};
pub use onramp::HttpOnrampRepository;
pub use pool::ProviderPool;
pub use quote::HttpQuoteProvider;
