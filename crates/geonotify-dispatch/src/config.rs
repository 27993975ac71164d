use std::time::Duration;

use crate::retry::RetryConfig;

/// Runtime settings shared by every dispatcher replica.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
  /// Subscriber endpoint every payload is POSTed to.
  pub webhook_url:     String,
  /// Bounded wait of each dequeue; cancellation cuts it short.
  pub pop_timeout:     Duration,
  pub request_timeout: Duration,
  pub retry:           RetryConfig,
}

impl DispatcherConfig {
  pub fn new(webhook_url: impl Into<String>) -> Self {
    Self {
      webhook_url:     webhook_url.into(),
      pop_timeout:     Duration::from_secs(5),
      request_timeout: Duration::from_secs(30),
      retry:           RetryConfig::DEFAULT,
    }
  }
}
