//! The delivery queue: a durable FIFO between location checks and the
//! webhook dispatcher.
//!
//! Elements are removed when a consumer dequeues them, so any number of
//! consumers may compete for the same queue without further coordination.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::{
  payload::{DeadLetter, DeliveryTask},
  store::Storage,
};

/// Logical name of the queue shared by all producers and consumers.
pub const WEBHOOK_QUEUE: &str = "webhook_queue";

pub trait DeliveryQueue: Storage {
  /// Serialize `task` and append it to the tail, eligible immediately.
  fn enqueue(
    &self,
    task: DeliveryTask,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append `task` to the tail, not eligible for dequeue before `not_before`.
  fn requeue(
    &self,
    task: DeliveryTask,
    not_before: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove and return the oldest eligible element, waiting at most
  /// `timeout`. `Ok(None)` means the wait elapsed with nothing to deliver.
  ///
  /// The element is returned undecoded; a malformed element is the
  /// consumer's problem, not a queue error.
  fn dequeue(
    &self,
    timeout: Duration,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// [`dequeue`](Self::dequeue), giving up early with `Ok(None)` once
  /// `cancel` fires. Cancellation only interrupts the wait: an element is
  /// either returned or left on the queue, never dropped.
  fn dequeue_until<'a>(
    &'a self,
    timeout: Duration,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Park an element that will never be delivered.
  fn dead_letter(
    &self,
    letter: DeadLetter,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The most recent dead letters, newest first.
  fn dead_letters(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<DeadLetter>, Self::Error>> + Send + '_;

  /// Number of elements currently queued, eligible or delayed.
  fn depth(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
