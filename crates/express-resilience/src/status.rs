//! HTTP status classification
//!
//! Turns a non-success response from the Express back-end into the
//! matching [`ExpressError`] so retry decisions stay in one place.

use express_error::ExpressError;
use std::time::Duration;

/// HTTP status helpers
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRetryClassifier;

impl HttpRetryClassifier {
    /// Check if HTTP status code is retryable
    pub fn is_status_retryable(status: u16) -> bool {
        matches!(
            status,
            408 | // Request Timeout
            425 | // Too Early
            429 | // Too Many Requests
            500 | // Internal Server Error
            502 | // Bad Gateway
            503 | // Service Unavailable
            504   // Gateway Timeout
        )
    }

    /// Check if status indicates rate limiting
    pub fn is_rate_limited(status: u16) -> bool {
        status == 429
    }

    /// Parse a `Retry-After` header given in seconds
    pub fn parse_retry_after(value: &str) -> Option<Duration> {
        value.trim().parse::<u64>().ok().map(Duration::from_secs)
    }

    /// Map a failed response to an error.
    ///
    /// 429 becomes [`ExpressError::RateLimited`] (default one second when the
    /// header is missing); 408 and 504 become [`ExpressError::Timeout`];
    /// everything else is kept as [`ExpressError::Api`].
    pub fn classify(
        status: u16,
        retry_after: Option<&str>,
        message: impl Into<String>,
        operation: &str,
    ) -> ExpressError {
        if Self::is_rate_limited(status) {
            let retry_after_secs = retry_after
                .and_then(Self::parse_retry_after)
                .map(|d| d.as_secs())
                .unwrap_or(1);
            return ExpressError::RateLimited { retry_after_secs };
        }

        if status == 408 || status == 504 {
            return ExpressError::Timeout {
                operation: operation.to_string(),
                millis: 0,
            };
        }

        ExpressError::Api {
            status,
            message: message.into(),
        }
    }
}
