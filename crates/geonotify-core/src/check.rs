//! The location-check flow: match, enqueue on a hit, audit, respond.
//!
//! Enqueue and audit are independent writes with no shared transaction. A
//! failed enqueue aborts the check before anything is persisted. A failed
//! audit write after a successful enqueue is only logged: the delivery is
//! already queued and may even complete before the audit row would have.

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::{
  Error, Result,
  geofence,
  location::{LocationCheckAudit, LocationCheckRequest, LocationCheckResponse},
  payload::{DeliveryTask, WebhookPayload},
  queue::DeliveryQueue,
  store::{AuditLog, IncidentStore},
};

/// Run one location check against the current set of active incidents.
///
/// At most one delivery task is enqueued per call, and only when at least one
/// incident matched.
#[instrument(skip_all, fields(user_id = request.user_id))]
pub async fn check_location<I, Q, A>(
  incidents: &I,
  queue:     &Q,
  audit:     &A,
  request:   LocationCheckRequest,
) -> Result<LocationCheckResponse>
where
  I: IncidentStore,
  Q: DeliveryQueue,
  A: AuditLog,
{
  request.validate()?;

  let snapshot = incidents
    .list_active_incidents()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let matched = geofence::matching_incidents(request.point(), &snapshot);
  let payload = WebhookPayload::for_check(&request, matched, Utc::now());

  if !payload.locations_ids.is_empty() {
    let task = DeliveryTask::new(payload.clone());
    let delivery_id = task.delivery_id;
    queue
      .enqueue(task)
      .await
      .map_err(|e| Error::EnqueueFailed(Box::new(e)))?;
    debug!(%delivery_id, matched = ?payload.locations_ids, "delivery task enqueued");
  }

  let record = LocationCheckAudit {
    user_id:      payload.user_id,
    latitude:     payload.latitude,
    longitude:    payload.longitude,
    incident_ids: payload.locations_ids.clone(),
    checked_at:   payload.checked_at,
  };
  if let Err(e) = audit.append_audit(record).await {
    warn!(error = %e, "failed to record location check audit");
  }

  Ok(payload.to_response())
}
