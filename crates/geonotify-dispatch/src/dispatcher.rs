//! The dispatcher loop: dequeue, POST to the subscriber, settle the task.
//!
//! Replicas share nothing but the queue. An element belongs to whichever
//! replica dequeued it, and the queue removes it atomically, so each element
//! is attempted by exactly one replica at a time.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use geonotify_core::{
  payload::{DeadLetter, DeliveryTask},
  queue::DeliveryQueue,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use crate::{
  config::DispatcherConfig,
  error::{DeliveryError, Error, Result},
  state::DeliveryState,
};

pub const DELIVERY_HEADER: &str = "X-Geonotify-Delivery";
pub const ATTEMPT_HEADER: &str = "X-Geonotify-Attempt";

/// Pause after a failed loop iteration, so a broken queue is not hammered.
const ERROR_PAUSE: Duration = Duration::from_millis(500);

pub struct Dispatcher<Q> {
  queue:  Arc<Q>,
  client: reqwest::Client,
  config: DispatcherConfig,
}

impl<Q: DeliveryQueue + 'static> Dispatcher<Q> {
  pub fn new(queue: Arc<Q>, config: DispatcherConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(config.request_timeout)
      .build()?;
    Ok(Self { queue, client, config })
  }

  /// Deliver until `cancel` fires.
  ///
  /// Cancellation interrupts the dequeue wait and the outbound call; a task
  /// interrupted mid-call goes back on the queue unchanged.
  pub async fn run(self, cancel: CancellationToken) {
    info!(url = %self.config.webhook_url, "dispatcher started");

    while !cancel.is_cancelled() {
      if let Err(e) = self.process_next(&cancel).await {
        error!(error = %e, "dispatcher iteration failed");
        tokio::select! {
          _ = cancel.cancelled() => break,
          _ = tokio::time::sleep(ERROR_PAUSE) => {}
        }
      }
    }

    info!("dispatcher stopped");
  }

  /// Take one element off the queue and drive it to its next state.
  ///
  /// `Ok(None)` means the dequeue timed out, or `cancel` fired, with
  /// nothing claimed.
  pub async fn process_next(
    &self,
    cancel: &CancellationToken,
  ) -> Result<Option<DeliveryState>> {
    let Some(raw) = self
      .queue
      .dequeue_until(self.config.pop_timeout, cancel)
      .await
      .map_err(Error::queue)?
    else {
      trace!("queue empty");
      return Ok(None);
    };

    let task = match DeliveryTask::from_json(&raw) {
      Ok(task) => task,
      Err(e) => {
        let reason = format!("undecodable queue element: {e}");
        warn!(error = %e, "dead-lettering undecodable queue element");
        self
          .queue
          .dead_letter(DeadLetter {
            delivery_id: None,
            raw,
            reason: reason.clone(),
            attempts: 0,
            failed_at: Utc::now(),
          })
          .await
          .map_err(Error::queue)?;
        return Ok(Some(DeliveryState::DeadLettered { reason }));
      }
    };

    let span = info_span!(
      "delivery",
      delivery_id = %task.delivery_id,
      attempt = task.attempt,
      user_id = task.payload.user_id,
    );
    self.deliver(task, raw, cancel).instrument(span).await.map(Some)
  }

  async fn deliver(
    &self,
    task: DeliveryTask,
    raw: String,
    cancel: &CancellationToken,
  ) -> Result<DeliveryState> {
    let in_flight = DeliveryState::InFlight { attempt: task.attempt };
    debug!(state = ?in_flight, "sending webhook");

    let outcome = tokio::select! {
      biased;
      _ = cancel.cancelled() => None,
      outcome = self.send(&task) => Some(outcome),
    };

    let Some(outcome) = outcome else {
      self.queue.enqueue(task).await.map_err(Error::queue)?;
      info!("delivery interrupted by shutdown, task re-queued");
      return Ok(DeliveryState::Pending);
    };

    let now = Utc::now();
    let next = DeliveryState::settle(
      task.attempt,
      outcome.as_ref().map(|_| ()),
      &self.config.retry,
      now,
    );

    match &next {
      DeliveryState::Delivered { .. } => info!("webhook delivered"),
      DeliveryState::RetryScheduled { attempt, retry_at } => {
        if let Err(e) = &outcome {
          warn!(
            error = %e,
            next_attempt = attempt,
            %retry_at,
            "delivery failed, retry scheduled"
          );
        }
        self
          .queue
          .requeue(task.next_attempt(), *retry_at)
          .await
          .map_err(Error::queue)?;
      }
      DeliveryState::DeadLettered { reason } => {
        error!(%reason, "delivery failed permanently");
        self
          .queue
          .dead_letter(DeadLetter {
            delivery_id: Some(task.delivery_id),
            raw,
            reason: reason.clone(),
            attempts: task.attempt + 1,
            failed_at: now,
          })
          .await
          .map_err(Error::queue)?;
      }
      DeliveryState::Pending | DeliveryState::InFlight { .. } => {}
    }

    Ok(next)
  }

  /// One POST of the bare payload. Any 2xx counts as delivered.
  async fn send(&self, task: &DeliveryTask) -> Result<(), DeliveryError> {
    let resp = self
      .client
      .post(&self.config.webhook_url)
      .header(DELIVERY_HEADER, task.delivery_id.to_string())
      .header(ATTEMPT_HEADER, task.attempt.to_string())
      .json(&task.payload)
      .send()
      .await
      .map_err(DeliveryError::Transport)?;

    let status = resp.status();
    if status.is_success() {
      Ok(())
    } else {
      Err(DeliveryError::Status(status))
    }
  }
}

/// Start `workers` competing dispatchers on the shared `queue`.
///
/// Each replica runs until `cancel` fires; join the handles to wait for
/// in-flight deliveries to settle.
pub fn spawn_replicas<Q: DeliveryQueue + 'static>(
  queue: Arc<Q>,
  config: &DispatcherConfig,
  workers: usize,
  cancel: &CancellationToken,
) -> Result<Vec<JoinHandle<()>>> {
  (0..workers.max(1))
    .map(|worker| {
      let dispatcher = Dispatcher::new(queue.clone(), config.clone())?;
      let span = info_span!("dispatcher", worker);
      Ok(tokio::spawn(dispatcher.run(cancel.clone()).instrument(span)))
    })
    .collect()
}
