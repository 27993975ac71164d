//! Webhook payloads and the queued delivery task that carries them.
//!
//! The queue element is a [`DeliveryTask`]: the [`WebhookPayload`] fields
//! flattened at the top level plus a delivery id and an attempt counter. The
//! outbound HTTP body is the bare payload, so subscribers see exactly
//! `{user_id, latitude, longitude, locations_ids, checked_at}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  location::{LocationCheckRequest, LocationCheckResponse},
};

/// The notification sent to the subscriber for a matching location check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
  pub user_id:       i64,
  pub latitude:      f64,
  pub longitude:     f64,
  pub locations_ids: Vec<i64>,
  pub checked_at:    DateTime<Utc>,
}

impl WebhookPayload {
  pub fn for_check(
    request: &LocationCheckRequest,
    locations_ids: Vec<i64>,
    checked_at: DateTime<Utc>,
  ) -> Self {
    Self {
      user_id: request.user_id,
      latitude: request.latitude,
      longitude: request.longitude,
      locations_ids,
      checked_at,
    }
  }

  pub fn to_response(&self) -> LocationCheckResponse {
    LocationCheckResponse {
      user_id:       self.user_id,
      latitude:      self.latitude,
      longitude:     self.longitude,
      locations_ids: self.locations_ids.clone(),
    }
  }
}

/// A queued delivery.
///
/// `attempt` is 0 for the first delivery and increments on every re-queue.
/// Elements written without `delivery_id`/`attempt` still decode; they get a
/// fresh id and attempt 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTask {
  #[serde(default = "Uuid::new_v4")]
  pub delivery_id: Uuid,
  #[serde(default)]
  pub attempt:     u32,
  #[serde(flatten)]
  pub payload:     WebhookPayload,
}

impl DeliveryTask {
  pub fn new(payload: WebhookPayload) -> Self {
    Self { delivery_id: Uuid::new_v4(), attempt: 0, payload }
  }

  /// The same delivery, one attempt later.
  pub fn next_attempt(&self) -> Self {
    Self { attempt: self.attempt + 1, ..self.clone() }
  }

  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn from_json(raw: &str) -> Result<Self> { Ok(serde_json::from_str(raw)?) }
}

/// A queue element that will not be delivered, kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
  /// The delivery id, when the element could be decoded.
  pub delivery_id: Option<Uuid>,
  /// The element exactly as it was dequeued.
  pub raw:         String,
  pub reason:      String,
  /// Delivery attempts made, including the last one.
  pub attempts:    u32,
  pub failed_at:   DateTime<Utc>,
}
