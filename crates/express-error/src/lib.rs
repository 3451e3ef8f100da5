//! # Express Error
//!
//! Unified error types for the Express quote aggregation SDK. Every crate in
//! the workspace reports failures through [`ExpressError`], so a failure can
//! travel from an HTTP provider, through the manager, into the state snapshot
//! a caller renders without being re-wrapped.
//!
//! ## Error Categories
//!
//! - Pair/amount validation: [`ExpressError::PairUnsupported`], [`ExpressError::InvalidAmount`]
//! - Provider restrictions: [`ExpressError::AmountTooSmall`], [`ExpressError::AmountTooBig`]
//! - Aggregation: [`ExpressError::NoProvidersAvailable`], [`ExpressError::ProviderNotEligible`]
//! - Transport: [`ExpressError::NetworkError`], [`ExpressError::Timeout`], [`ExpressError::Api`]
//! - Manager lifecycle: [`ExpressError::InvalidState`], [`ExpressError::Superseded`],
//!   [`ExpressError::ManagerClosed`]
//!
//! ## Example
//!
//! ```
//! use express_error::{ExpressError, Result};
//!
//! fn validate_amount(value: u128) -> Result<u128> {
//!     if value == 0 {
//!         return Err(ExpressError::InvalidAmount("amount must be greater than zero".into()));
//!     }
//!     Ok(value)
//! }
//!
//! assert!(validate_amount(0).is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use thiserror::Error;

/// The main error type for Express operations.
///
/// `Clone` is required: failures are stored inside immutable state snapshots
/// and handed to every subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressError {
    // ============ Pair/Amount Errors ============
    /// No registered provider can quote the pair
    #[error("Pair unsupported: {source_currency} -> {destination_currency}")]
    PairUnsupported {
        /// Source currency symbol
        source_currency: String,
        /// Destination currency symbol
        destination_currency: String,
    },

    /// Amount failed validation (zero, malformed, outside provider limits)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Provider reported the amount is below its minimum
    #[error("Amount too small, minimum is {minimum} (smallest units)")]
    AmountTooSmall {
        /// Minimum accepted amount in smallest units of the source currency
        minimum: u128,
    },

    /// Provider reported the amount is above its maximum
    #[error("Amount too big, maximum is {maximum} (smallest units)")]
    AmountTooBig {
        /// Maximum accepted amount in smallest units of the source currency
        maximum: u128,
    },

    /// Not enough balance to cover the amount or the fee
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    // ============ Aggregation Errors ============
    /// Provider is absent from the last resolved snapshot
    #[error("Provider not eligible: {0}")]
    ProviderNotEligible(String),

    /// Every provider failed for the current pair and amount
    #[error("No providers available for the current pair and amount")]
    NoProvidersAvailable,

    /// A provider rejected the request
    #[error("Provider {provider_id} failed: {message}")]
    Provider {
        /// Provider identifier
        provider_id: String,
        /// Error message
        message: String,
    },

    // ============ Network Errors ============
    /// Transport level failure
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Collaborator call timed out
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Timeout in milliseconds
        millis: u64,
    },

    /// Rate limited by the remote API
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested retry delay
        retry_after_secs: u64,
    },

    /// Remote API answered with an error status
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    // ============ Manager State Errors ============
    /// Operation is not valid in the current manager state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A newer input replaced the one this call was resolving
    #[error("Superseded by a newer update")]
    Superseded,

    /// The manager was disposed
    #[error("Manager closed")]
    ManagerClosed,

    // ============ Feature/Support Errors ============
    /// Feature not supported by this collaborator
    #[error("Not supported: {0}")]
    NotSupported(String),

    // ============ Parsing/Config Errors ============
    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File IO error
    #[error("IO error: {0}")]
    Io(String),

    // ============ Generic ============
    /// Unknown/other error
    #[error("{0}")]
    Other(String),
}

/// Convenient Result type using ExpressError
pub type Result<T> = std::result::Result<T, ExpressError>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Adds context to an error
    fn context(self, ctx: impl Into<String>) -> Result<T>;

    /// Adds context using a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| ExpressError::Other(format!("{}: {}", ctx.into(), e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| ExpressError::Other(format!("{}: {}", f(), e)))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| ExpressError::Other(ctx.into()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| ExpressError::Other(f()))
    }
}

// ============ From implementations for common error types ============

impl From<std::io::Error> for ExpressError {
    fn from(err: std::io::Error) -> Self {
        ExpressError::Io(err.to_string())
    }
}

impl From<std::num::ParseIntError> for ExpressError {
    fn from(err: std::num::ParseIntError) -> Self {
        ExpressError::InvalidAmount(err.to_string())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for ExpressError {
    fn from(err: serde_json::Error) -> Self {
        ExpressError::Json(err.to_string())
    }
}

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// Unknown error
    Unknown = 0,
    /// Pair unsupported
    PairUnsupported = 1001,
    /// Invalid amount
    InvalidAmount = 2001,
    /// Amount below provider minimum
    AmountTooSmall = 2002,
    /// Amount above provider maximum
    AmountTooBig = 2003,
    /// Insufficient funds
    InsufficientFunds = 2004,
    /// Provider not eligible
    ProviderNotEligible = 3001,
    /// No providers available
    NoProvidersAvailable = 3002,
    /// Provider failure
    Provider = 3003,
    /// Network error
    NetworkError = 4001,
    /// Timeout
    Timeout = 4002,
    /// Rate limited
    RateLimited = 4003,
    /// API error status
    Api = 4004,
    /// Invalid manager state
    InvalidState = 5001,
    /// Superseded update
    Superseded = 5002,
    /// Manager closed
    ManagerClosed = 5003,
    /// Not supported
    NotSupported = 9001,
}

impl ExpressError {
    /// Returns the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ExpressError::PairUnsupported { .. } => ErrorCode::PairUnsupported,
            ExpressError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            ExpressError::AmountTooSmall { .. } => ErrorCode::AmountTooSmall,
            ExpressError::AmountTooBig { .. } => ErrorCode::AmountTooBig,
            ExpressError::InsufficientFunds(_) => ErrorCode::InsufficientFunds,
            ExpressError::ProviderNotEligible(_) => ErrorCode::ProviderNotEligible,
            ExpressError::NoProvidersAvailable => ErrorCode::NoProvidersAvailable,
            ExpressError::Provider { .. } => ErrorCode::Provider,
            ExpressError::NetworkError(_) => ErrorCode::NetworkError,
            ExpressError::Timeout { .. } => ErrorCode::Timeout,
            ExpressError::RateLimited { .. } => ErrorCode::RateLimited,
            ExpressError::Api { .. } => ErrorCode::Api,
            ExpressError::InvalidState(_) => ErrorCode::InvalidState,
            ExpressError::Superseded => ErrorCode::Superseded,
            ExpressError::ManagerClosed => ErrorCode::ManagerClosed,
            ExpressError::NotSupported(_) => ErrorCode::NotSupported,
            _ => ErrorCode::Unknown,
        }
    }

    /// Returns true if retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ExpressError::NetworkError(_)
            | ExpressError::Timeout { .. }
            | ExpressError::RateLimited { .. } => true,
            ExpressError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the error is meant to be shown to the user
    /// rather than reported as a programming mistake
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            ExpressError::ProviderNotEligible(_)
                | ExpressError::InvalidState(_)
                | ExpressError::Superseded
                | ExpressError::ManagerClosed
        )
    }

    /// Returns true for provider-reported amount limits
    pub fn is_amount_restriction(&self) -> bool {
        matches!(
            self,
            ExpressError::AmountTooSmall { .. } | ExpressError::AmountTooBig { .. }
        )
    }

    /// Returns suggested retry delay in seconds, if applicable
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ExpressError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            ExpressError::Timeout { millis, .. } => Some((*millis / 2000).max(1)),
            _ if self.is_retryable() => Some(5),
            _ => None,
        }
    }
}
