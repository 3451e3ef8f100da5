//! Exponential backoff with jitter
//!
//! Retry delays grow exponentially with random jitter. Only errors that
//! [`ExpressError::is_retryable`] accepts are retried; a provider saying
//! "amount too small" is an answer, not an outage.

use express_error::{ExpressError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

/// Retry schedule for back-end calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the second attempt
    #[serde(with = "millis")]
    pub initial_delay: Duration,
    /// Maximum delay cap
    #[serde(with = "millis")]
    pub max_delay: Duration,
    /// Growth factor between delays
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
    /// Attempts in total, the first call included
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: 3,
        }
    }
}

impl BackoffConfig {
    /// Default schedule: 3 attempts starting at 200ms
    pub fn new() -> Self {
        Self::default()
    }

    /// Set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Jitter as a fraction of the delay, clamped to 0..=1
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Set maximum attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Returns an error for configs that can never make a call
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ExpressError::Config("max_attempts must be at least 1".into()));
        }
        if self.multiplier < 1.0 {
            return Err(ExpressError::Config("backoff multiplier must be >= 1.0".into()));
        }
        Ok(())
    }
}

/// Exponential backoff iterator yielding the delay before each retry
#[derive(Debug)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
    current_delay: Duration,
}

impl ExponentialBackoff {
    /// Starts a schedule at attempt zero
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current_delay: config.initial_delay,
            config,
            attempt: 0,
        }
    }

    /// Attempts consumed so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Check if more attempts are allowed
    pub fn can_retry(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Attempts left before giving up
    pub fn remaining_attempts(&self) -> u32 {
        self.config.max_attempts.saturating_sub(self.attempt)
    }

    fn delay_with_jitter(&self, base_delay: Duration) -> Duration {
        if self.config.jitter <= 0.0 || base_delay.is_zero() {
            return base_delay;
        }

        let mut rng = rand::thread_rng();
        let jitter_range = base_delay.as_secs_f64() * self.config.jitter;
        let jitter = rng.gen_range(-jitter_range..jitter_range);
        let jittered = base_delay.as_secs_f64() + jitter;

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.can_retry() {
            return None;
        }

        let delay = self.delay_with_jitter(self.current_delay);
        let capped_delay = delay.min(self.config.max_delay);

        self.attempt += 1;
        self.current_delay = Duration::from_secs_f64(
            (self.current_delay.as_secs_f64() * self.config.multiplier)
                .min(self.config.max_delay.as_secs_f64()),
        );

        Some(capped_delay)
    }
}

/// Run `f` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. The last error is returned unchanged.
///
/// A rate-limit answer overrides the computed delay with the server's
/// `retry_after`, still capped by `max_delay`.
pub async fn with_backoff<F, Fut, T>(config: &BackoffConfig, operation: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = ExponentialBackoff::new(config.clone());

    loop {
        let delay = backoff.next();
        let error = match f().await {
            Ok(result) => return Ok(result),
            Err(error) => error,
        };

        if !error.is_retryable() || !backoff.can_retry() {
            if backoff.attempt() > 1 {
                debug!(
                    operation,
                    attempts = backoff.attempt(),
                    error = %error,
                    "giving up"
                );
            }
            return Err(error);
        }

        let wait = match &error {
            ExpressError::RateLimited { retry_after_secs } => {
                Duration::from_secs(*retry_after_secs).min(config.max_delay)
            }
            _ => delay.unwrap_or(config.initial_delay),
        };

        debug!(
            operation,
            attempt = backoff.attempt(),
            remaining = backoff.remaining_attempts(),
            error = %error,
            "retryable failure"
        );
        trace!(delay = ?wait, "waiting before retry");
        tokio::time::sleep(wait).await;
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
