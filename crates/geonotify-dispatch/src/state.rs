//! Per-task delivery state machine.
//!
//! ```text
//! Pending ──▶ InFlight ──▶ Delivered
//!    ▲            │
//!    │            ├──▶ RetryScheduled ──▶ (queue) ──▶ Pending
//!    │            │
//!    └─cancelled──┤
//!                 └──▶ DeadLettered
//! ```

use chrono::{DateTime, TimeDelta, Utc};

use crate::{error::DeliveryError, retry::RetryConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryState {
  /// Queued, waiting for a dispatcher.
  Pending,
  InFlight { attempt: u32 },
  Delivered { attempt: u32 },
  /// Back on the queue as `attempt`, not eligible before `retry_at`.
  RetryScheduled { attempt: u32, retry_at: DateTime<Utc> },
  /// Final; the element is kept in the dead-letter table.
  DeadLettered { reason: String },
}

impl DeliveryState {
  /// Where an in-flight task goes once attempt `attempt` returned `outcome`.
  pub fn settle(
    attempt: u32,
    outcome: Result<(), &DeliveryError>,
    retry: &RetryConfig,
    now: DateTime<Utc>,
  ) -> Self {
    let err = match outcome {
      Ok(()) => return Self::Delivered { attempt },
      Err(err) => err,
    };

    if !err.is_retryable() {
      return Self::DeadLettered { reason: err.to_string() };
    }
    if !retry.allows_retry(attempt) {
      return Self::DeadLettered {
        reason: format!("gave up after {} attempt(s): {err}", attempt + 1),
      };
    }

    // Delays too large to represent push the retry to the end of time.
    let retry_at = TimeDelta::from_std(retry.delay_for_attempt(attempt))
      .ok()
      .and_then(|delay| now.checked_add_signed(delay))
      .unwrap_or(DateTime::<Utc>::MAX_UTC);
    Self::RetryScheduled { attempt: attempt + 1, retry_at }
  }

  pub fn is_final(&self) -> bool {
    matches!(self, Self::Delivered { .. } | Self::DeadLettered { .. })
  }
}
