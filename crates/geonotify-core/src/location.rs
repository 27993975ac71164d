//! Location check request, response and the persisted audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A point in raw coordinate degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub latitude:  f64,
  pub longitude: f64,
}

/// Body of `POST /location/check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCheckRequest {
  pub user_id:   i64,
  pub latitude:  f64,
  pub longitude: f64,
}

impl LocationCheckRequest {
  pub fn validate(&self) -> Result<()> {
    if self.user_id <= 0 {
      return Err(Error::InvalidUserId(self.user_id));
    }
    Ok(())
  }

  pub fn point(&self) -> Point {
    Point { latitude: self.latitude, longitude: self.longitude }
  }
}

/// Echo of the request plus the ids of every matched incident, in scan order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCheckResponse {
  pub user_id:       i64,
  pub latitude:      f64,
  pub longitude:     f64,
  pub locations_ids: Vec<i64>,
}

/// One row per location check, written whether or not anything matched.
/// Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCheckAudit {
  pub user_id:      i64,
  pub latitude:     f64,
  pub longitude:    f64,
  pub incident_ids: Vec<i64>,
  pub checked_at:   DateTime<Utc>,
}
