//! # Express Resilience
//!
//! Timeouts and retries for the network calls the Express SDK makes:
//! provider quotes, fee estimates and the back-end HTTP API.
//!
//! - **Timeouts**: per-operation budgets, expiry reported as [`ExpressError::Timeout`]
//! - **Exponential Backoff**: retries only for errors that may succeed on retry
//! - **Status classification**: HTTP status to [`ExpressError`] mapping
//!
//! ```rust,no_run
//! use express_resilience::{with_backoff, with_timeout, BackoffConfig, TimeoutConfig};
//!
//! # async fn example() -> express_error::Result<()> {
//! let timeouts = TimeoutConfig::default();
//! let value = with_backoff(&BackoffConfig::default(), "quote", || {
//!     with_timeout(timeouts.quote, "quote", async { Ok(42) })
//! })
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backoff;
pub mod status;
pub mod timeout;

pub use backoff::{with_backoff, BackoffConfig, ExponentialBackoff};
pub use express_error::ExpressError;
pub use status::HttpRetryClassifier;
pub use timeout::{with_timeout, TimeoutConfig};

/// Prelude for common imports
pub mod prelude {
    pub use crate::backoff::{with_backoff, BackoffConfig};
    pub use crate::status::HttpRetryClassifier;
    pub use crate::timeout::{with_timeout, TimeoutConfig};
}
