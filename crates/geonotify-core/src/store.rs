//! Storage traits: the incident store and the location-check audit log.
//!
//! Implemented by storage backends (e.g. `geonotify-store-sqlite`). Higher
//! layers (`geonotify-api`, `geonotify-dispatch`) depend on these
//! abstractions, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  incident::{Incident, IncidentUpdate, NewIncident},
  location::LocationCheckAudit,
};

/// The error type shared by every capability a backend implements.
///
/// [`IncidentStore`], [`AuditLog`] and
/// [`DeliveryQueue`](crate::queue::DeliveryQueue) all extend this trait, so a
/// single backend implementing all three has one unambiguous `S::Error`.
pub trait Storage: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Cheap liveness probe.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Parameters for [`IncidentStore::list_incidents`]. Both fields are 1-based
/// and must be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page:      u32,
  pub page_size: u32,
}

impl Page {
  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
  }
}

impl Default for Page {
  fn default() -> Self { Self { page: 1, page_size: 20 } }
}

/// Abstraction over the incident store.
///
/// Incidents are never deleted; [`deactivate_incident`](Self::deactivate_incident)
/// flips the active flag instead.
pub trait IncidentStore: Storage {
  /// Persist a new, active incident. The store assigns the id and timestamps.
  fn create_incident(
    &self,
    input: NewIncident,
  ) -> impl Future<Output = Result<Incident, Self::Error>> + Send + '_;

  /// Retrieve an incident by id. Returns `None` if not found.
  fn get_incident(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Incident>, Self::Error>> + Send + '_;

  /// One page of incidents, newest first, active or not.
  fn list_incidents(
    &self,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;

  /// Replace the mutable fields of an incident. Returns `None` if not found.
  fn update_incident(
    &self,
    id: i64,
    update: IncidentUpdate,
  ) -> impl Future<Output = Result<Option<Incident>, Self::Error>> + Send + '_;

  /// Mark an incident inactive. Returns `false` if no such incident exists.
  fn deactivate_incident(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Every active incident in creation order. This is the snapshot the
  /// geofence matcher scans.
  fn list_active_incidents(
    &self,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;
}

/// Append-only record of location checks.
pub trait AuditLog: Storage {
  fn append_audit(
    &self,
    record: LocationCheckAudit,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Number of distinct users with at least one check at or after `since`.
  fn count_users_since(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
