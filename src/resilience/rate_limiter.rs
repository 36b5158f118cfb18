//! # Rate Limiter
//!
//! Minimum-interval pacing for a single-threaded caller. Uses
//! [`tokio::time::Instant`], a monotonic clock that tests can pause and
//! advance deterministically.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

use crate::config::RateLimitConfig;

/// Enforces that no two calls start less than `interval` apart.
///
/// `wait` takes `&mut self`: the limiter is owned by one caller and is not
/// meant to be shared across tasks.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    interval: Duration,
    last_call: Option<Instant>,
    calls: u64,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            last_call: None,
            calls: 0,
        }
    }

    pub fn from_config(name: impl Into<String>, config: &RateLimitConfig) -> Self {
        Self::new(name, config.min_interval())
    }

    /// Suspend until at least `interval` has passed since the previous `wait`
    /// returned, then record now as the latest call time.
    ///
    /// Returns how long the caller was held back.
    pub async fn wait(&mut self) -> Duration {
        let mut waited = Duration::ZERO;

        if let Some(last_call) = self.last_call {
            let ready_at = last_call + self.interval;
            let now = Instant::now();
            if ready_at > now {
                waited = ready_at - now;
                trace!(
                    limiter = %self.name,
                    wait_ms = waited.as_millis() as u64,
                    "Rate limiter holding call"
                );
                sleep_until(ready_at).await;
            }
        }

        self.last_call = Some(Instant::now());
        self.calls += 1;
        waited
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of calls admitted so far
    pub fn calls(&self) -> u64 {
        self.calls
    }
}
