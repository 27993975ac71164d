//! Exponential backoff for failed webhook deliveries.
//!
//! A retry is not a loop around the HTTP call: the task goes back on the
//! queue with `not_before = now + delay_for_attempt(attempt)`, so any
//! dispatcher replica may pick it up and nothing is lost if this process
//! stops in the meantime.

use std::time::Duration;

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
  /// Maximum number of retries, not counting the first attempt.
  pub max_retries:        u32,
  /// Delay before the first retry.
  pub initial_delay:      Duration,
  /// Cap for the exponential growth.
  pub max_delay:          Duration,
  pub backoff_multiplier: f64,
}

impl RetryConfig {
  /// 3 retries with 2s, 4s, 8s delays.
  pub const DEFAULT: Self = Self {
    max_retries:        3,
    initial_delay:      Duration::from_secs(2),
    max_delay:          Duration::from_secs(60),
    backoff_multiplier: 2.0,
  };

  /// A single attempt; every failure is final.
  pub const NONE: Self = Self {
    max_retries:        0,
    initial_delay:      Duration::ZERO,
    max_delay:          Duration::ZERO,
    backoff_multiplier: 1.0,
  };

  pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
    Self { max_retries, initial_delay, max_delay, backoff_multiplier: 2.0 }
  }

  /// Delay before retrying a task whose attempt number `attempt` (0-based)
  /// just failed: `initial_delay * backoff_multiplier^attempt`, capped at
  /// `max_delay`.
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let multiplier = self.backoff_multiplier.powi(exponent);
    let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
    let capped_secs = delay_secs.min(self.max_delay.as_secs_f64()).max(0.0);
    Duration::try_from_secs_f64(capped_secs).unwrap_or(self.max_delay)
  }

  /// Whether a task that failed on attempt `attempt` may be tried again.
  pub fn allows_retry(&self, attempt: u32) -> bool { attempt < self.max_retries }
}

impl Default for RetryConfig {
  fn default() -> Self { Self::DEFAULT }
}
