//! Timeouts for collaborator calls
//!
//! Every network-bound call the manager makes (quote, fee estimate,
//! trade initiation) runs under one of these budgets.

use express_error::{ExpressError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Timeout budgets per operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Budget for one provider quote
    #[serde(with = "millis")]
    pub quote: Duration,
    /// Budget for one fee estimate
    #[serde(with = "millis")]
    pub fee: Duration,
    /// Budget for trade initiation
    #[serde(with = "millis")]
    pub exchange_data: Duration,
    /// Budget for a single HTTP request
    #[serde(with = "millis")]
    pub request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            quote: Duration::from_secs(10),
            fee: Duration::from_secs(10),
            exchange_data: Duration::from_secs(30),
            request: Duration::from_secs(30),
        }
    }
}

impl TimeoutConfig {
    /// Create new timeout config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set quote timeout
    pub fn with_quote(mut self, timeout: Duration) -> Self {
        self.quote = timeout;
        self
    }

    /// Set fee timeout
    pub fn with_fee(mut self, timeout: Duration) -> Self {
        self.fee = timeout;
        self
    }

    /// Set exchange data timeout
    pub fn with_exchange_data(mut self, timeout: Duration) -> Self {
        self.exchange_data = timeout;
        self
    }

    /// Set HTTP request timeout
    pub fn with_request(mut self, timeout: Duration) -> Self {
        self.request = timeout;
        self
    }

    /// Tight budgets for tests and local back-ends
    pub fn fast() -> Self {
        Self {
            quote: Duration::from_secs(2),
            fee: Duration::from_secs(2),
            exchange_data: Duration::from_secs(5),
            request: Duration::from_secs(5),
        }
    }

    /// Returns an error if any budget is zero
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("quote", self.quote),
            ("fee", self.fee),
            ("exchange_data", self.exchange_data),
            ("request", self.request),
        ] {
            if value.is_zero() {
                return Err(ExpressError::Config(format!("{} timeout must be non-zero", name)));
            }
        }
        Ok(())
    }
}

/// Run `future` under `duration`, reporting expiry as [`ExpressError::Timeout`]
pub async fn with_timeout<T>(
    duration: Duration,
    operation: impl Into<String>,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ExpressError::Timeout {
            operation: operation.into(),
            millis: duration.as_millis() as u64,
        }),
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
