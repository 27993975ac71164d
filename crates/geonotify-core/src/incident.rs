//! Incident: a geographically bounded zone that location checks match against.
//!
//! Incidents are never deleted. Deactivation flips `active` to `false`, after
//! which the matcher ignores the incident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A stored incident zone.
///
/// `radius_m` is compared against the sum of absolute coordinate deltas (see
/// [`crate::geofence`]), so despite its name it is expressed in raw degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
  pub id:          i64,
  pub title:       String,
  pub description: String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub radius_m:    i64,
  pub active:      bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input for creating an incident. The store assigns the id and timestamps,
/// and new incidents always start active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub radius_m:    i64,
}

impl NewIncident {
  pub fn validate(&self) -> Result<()> {
    validate_fields(&self.title, self.radius_m)
  }
}

/// Full replacement of an incident's mutable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentUpdate {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub radius_m:    i64,
  #[serde(default = "default_active")]
  pub active:      bool,
}

impl IncidentUpdate {
  pub fn validate(&self) -> Result<()> {
    validate_fields(&self.title, self.radius_m)
  }
}

fn default_active() -> bool { true }

fn validate_fields(title: &str, radius_m: i64) -> Result<()> {
  if title.trim().is_empty() {
    return Err(Error::Validation("title is required".to_owned()));
  }
  if radius_m < 0 {
    return Err(Error::Validation(format!(
      "radius_m must not be negative, got {radius_m}"
    )));
  }
  Ok(())
}
