//! The durable delivery queue, as a table of rows claimed by deletion.
//!
//! `dequeue` removes the oldest eligible row with a single
//! `DELETE … RETURNING`, so two consumers can never claim the same row.
//! Producers in this process wake blocked consumers through a shared
//! [`Notify`](tokio::sync::Notify); rows that become eligible later (delayed
//! retries) or that another process wrote are found by periodic polling.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use geonotify_core::{
  payload::{DeadLetter, DeliveryTask},
  queue::{DeliveryQueue, WEBHOOK_QUEUE},
};

use crate::{
  Result, SqliteStore,
  encode::{RawDeadLetter, encode_dt, encode_millis},
};

impl SqliteStore {
  async fn push(&self, task: DeliveryTask, not_before_ms: i64) -> Result<()> {
    let payload = task.to_json()?;
    let at_str  = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO webhook_queue (queue, payload, not_before_ms, enqueued_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![WEBHOOK_QUEUE, payload, not_before_ms, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.wakeup.notify_waiters();
    Ok(())
  }

  /// Claim the oldest eligible row, if any.
  async fn try_pop(&self) -> Result<Option<String>> {
    let now_ms = encode_millis(Utc::now());

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        use rusqlite::OptionalExtension as _;
        Ok(conn
          .query_row(
            "DELETE FROM webhook_queue
             WHERE seq = (
               SELECT seq FROM webhook_queue
               WHERE queue = ?1 AND not_before_ms <= ?2
               ORDER BY seq
               LIMIT 1
             )
             RETURNING payload",
            rusqlite::params![WEBHOOK_QUEUE, now_ms],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(raw)
  }
}

impl DeliveryQueue for SqliteStore {
  async fn enqueue(&self, task: DeliveryTask) -> Result<()> {
    self.push(task, 0).await
  }

  async fn requeue(&self, task: DeliveryTask, not_before: DateTime<Utc>) -> Result<()> {
    self.push(task, encode_millis(not_before)).await
  }

  async fn dequeue(&self, timeout: Duration) -> Result<Option<String>> {
    self.dequeue_until(timeout, &CancellationToken::new()).await
  }

  async fn dequeue_until(
    &self,
    timeout: Duration,
    cancel: &CancellationToken,
  ) -> Result<Option<String>> {
    let deadline = Instant::now() + timeout;

    loop {
      // Register interest before looking, so a push landing between the
      // look and the wait is not missed.
      let notified = self.wakeup.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();

      // A cancelled consumer must not claim anything it will not process.
      if cancel.is_cancelled() {
        return Ok(None);
      }
      if let Some(raw) = self.try_pop().await? {
        return Ok(Some(raw));
      }

      let now = Instant::now();
      if now >= deadline {
        trace!("dequeue timed out with nothing eligible");
        return Ok(None);
      }

      // Only the wait is raced against cancellation; `try_pop` always runs
      // to completion.
      let wait = (deadline - now).min(self.poll_interval);
      tokio::select! {
        _ = cancel.cancelled() => {
          trace!("dequeue cancelled while waiting");
          return Ok(None);
        }
        _ = tokio::time::timeout(wait, notified) => {}
      }
    }
  }

  async fn dead_letter(&self, letter: DeadLetter) -> Result<()> {
    let delivery_id = letter.delivery_id.map(|id| id.hyphenated().to_string());
    let at_str      = encode_dt(letter.failed_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO webhook_dead_letters
             (queue, delivery_id, payload, reason, attempts, failed_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            WEBHOOK_QUEUE,
            delivery_id,
            letter.raw,
            letter.reason,
            letter.attempts,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn dead_letters(&self, limit: u32) -> Result<Vec<DeadLetter>> {
    let raws: Vec<RawDeadLetter> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT delivery_id, payload, reason, attempts, failed_at
           FROM webhook_dead_letters
           WHERE queue = ?1
           ORDER BY id DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![WEBHOOK_QUEUE, limit], |row| {
            Ok(RawDeadLetter {
              delivery_id: row.get(0)?,
              payload:     row.get(1)?,
              reason:      row.get(2)?,
              attempts:    row.get(3)?,
              failed_at:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDeadLetter::into_dead_letter).collect()
  }

  async fn depth(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM webhook_queue WHERE queue = ?1",
          rusqlite::params![WEBHOOK_QUEUE],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }
}
