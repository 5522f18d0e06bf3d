//! Bounded retry with exponential backoff
//!
//! [`RetryPolicy`] wraps any fallible async operation. It is stateless across
//! invocations: every call to [`RetryPolicy::execute`] starts its own attempt
//! counter.

use crate::config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Classifies an error as transient (worth retrying) or permanent
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retry policy with exponential backoff
///
/// The delay before retry `i` (0-based) is `initial_delay * backoff_multiplier^i`.
/// Total attempts are `max_retries + 1`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_multiplier,
        }
    }

    /// Builds a policy from the `[retry]` config section
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.retry_delay(),
            config.retry_backoff,
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay slept before retry number `retry_index` (0 for the first retry)
    ///
    /// Saturates at [`Duration::MAX`] when the product overflows.
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let factor = self.backoff_multiplier.powi(retry_index.min(i32::MAX as u32) as i32);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Runs `operation`, retrying errors whose [`Retryable`] impl says so
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.execute_if(operation, |err: &E| err.is_retryable())
            .await
    }

    /// Runs `operation`, retrying only errors accepted by `should_retry`
    ///
    /// Non-retryable errors propagate immediately without sleeping. Once
    /// `max_retries` retries are spent the last error is returned.
    pub async fn execute_if<F, Fut, T, E, P>(
        &self,
        mut operation: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut retry_index = 0u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !should_retry(&err) {
                        return Err(err);
                    }

                    if retry_index >= self.max_retries {
                        tracing::warn!(
                            attempts = retry_index + 1,
                            max_retries = self.max_retries,
                            error = %err,
                            "Max retries exhausted"
                        );
                        return Err(err);
                    }

                    let delay = self.delay_for(retry_index);
                    tracing::debug!(
                        attempt = retry_index + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    retry_index += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
