//! # Resilience Module
//!
//! Call pacing and retry timing for the external API.
//!
//! - **Rate limiting**: [`RateLimiter`] guarantees a minimum spacing between
//!   external calls. Its state lives in the instance, which the controller owns
//!   for exactly one invocation.
//! - **Backoff**: [`RetryPolicy`] computes exponential delays between attempts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pacer_core::resilience::{RateLimiter, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let mut limiter = RateLimiter::new("speech_api", Duration::from_millis(500));
//! let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(30));
//!
//! for attempt in 0..policy.max_attempts() {
//!     limiter.wait().await;
//!     // external call here
//!     tokio::time::sleep(policy.delay_for(attempt)).await;
//! }
//! # }
//! ```

pub mod backoff;
pub mod rate_limiter;

pub use backoff::RetryPolicy;
pub use rate_limiter::RateLimiter;
