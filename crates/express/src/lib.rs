//! # Express - Swap Quote Aggregation
//!
//! The state core of a wallet's swap ("Express") and on-ramp flows:
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`manager`] | Single-writer session that aggregates quotes and fees into one snapshot |
//! | [`fee`] | Fee estimation per provider type and approve policy |
//! | [`onramp`] | Payment method filtering and preselection |
//! | [`config`] | JSON configuration with environment overrides |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! Providers are registered in an [`ProviderPool`]; HTTP-backed providers and
//! the on-ramp catalog live in `express-provider`.
//!
//! ## Example
//!
//! ```ignore
//! use express::prelude::*;
//!
//! let config = ExpressConfig::load_with_env("express.json")?;
//! init_tracing(&config.logging)?;
//!
//! let manager = ExpressManager::new(pool, fee_provider, ManagerConfig::from(&config));
//! manager.update_pair(pair).await?;
//! let state = manager
//!     .update_amount(Some(amount), ExpressProviderUpdateSource::AmountChange)
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod fee;
pub mod logging;
pub mod manager;
pub mod onramp;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{ApiConfig, ExpressConfig};
pub use express_error::{ErrorContext, ExpressError, Result};
pub use express_provider::{ExpressApiClient, HttpOnrampRepository, HttpQuoteProvider, ProviderPool};
pub use express_resilience::{BackoffConfig, TimeoutConfig};
pub use express_traits::*;
pub use fee::FeeResolver;
pub use logging::{init_tracing, LogFormat, LoggingConfig};
pub use manager::{
    ExpressManager, ExpressManagerState, ExpressProviderUpdateSource, ExpressReadyQuote,
    ExpressStatus, ManagerConfig,
};
pub use onramp::PaymentMethodDeterminer;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::ExpressConfig;
    pub use crate::logging::init_tracing;
    pub use crate::manager::{
        ExpressManager, ExpressManagerState, ExpressProviderUpdateSource, ExpressStatus,
        ManagerConfig,
    };
    pub use crate::onramp::PaymentMethodDeterminer;
    pub use express_provider::ProviderPool;
    pub use express_traits::prelude::*;
}
