//! Per-site request pacing
//!
//! One [`RateLimiter`] is shared by every fetch task of a site session, so the
//! site-wide request rate stays capped no matter how many tasks are waiting.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing between granted permits
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum time between two permits
    interval: Duration,

    /// When the previous permit was granted
    last_permit: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing at most `requests_per_second` permits per second
    ///
    /// A non-positive rate disables pacing.
    pub fn new(requests_per_second: f64) -> Self {
        let interval = if requests_per_second > 0.0 && requests_per_second.is_finite() {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };

        Self {
            interval,
            last_permit: Mutex::new(None),
        }
    }

    /// Minimum spacing between permits
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Suspends until at least one interval has elapsed since the previous permit
    ///
    /// The lock is held across the sleep, so concurrent callers queue up behind
    /// each other and are released one interval apart.
    pub async fn wait(&self) {
        let mut last = self.last_permit.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let delay = self.interval - elapsed;
                tracing::trace!(delay_ms = delay.as_millis() as u64, "Rate limiter pausing");
                tokio::time::sleep(delay).await;
            }
        }

        *last = Some(Instant::now());
    }
}
