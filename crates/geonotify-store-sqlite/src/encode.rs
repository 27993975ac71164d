//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order equals chronological order. Id lists are stored as
//! compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use geonotify_core::{incident::Incident, payload::DeadLetter};
use uuid::Uuid;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Unix milliseconds, used for the queue's eligibility column.
pub fn encode_millis(dt: DateTime<Utc>) -> i64 { dt.timestamp_millis() }

// ─── Id lists ────────────────────────────────────────────────────────────────

pub fn encode_ids(ids: &[i64]) -> Result<String> { Ok(serde_json::to_string(ids)?) }

#[cfg(test)]
pub fn decode_ids(s: &str) -> Result<Vec<i64>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawIncident::from_row`].
pub const INCIDENT_COLUMNS: &str =
  "id, title, description, latitude, longitude, radius_m, active, created_at, updated_at";

/// Raw values read directly from an `incidents` row.
pub struct RawIncident {
  pub id:          i64,
  pub title:       String,
  pub description: String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub radius_m:    i64,
  pub active:      bool,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawIncident {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      title:       row.get(1)?,
      description: row.get(2)?,
      latitude:    row.get(3)?,
      longitude:   row.get(4)?,
      radius_m:    row.get(5)?,
      active:      row.get(6)?,
      created_at:  row.get(7)?,
      updated_at:  row.get(8)?,
    })
  }

  pub fn into_incident(self) -> Result<Incident> {
    Ok(Incident {
      id:          self.id,
      title:       self.title,
      description: self.description,
      latitude:    self.latitude,
      longitude:   self.longitude,
      radius_m:    self.radius_m,
      active:      self.active,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `webhook_dead_letters` row.
pub struct RawDeadLetter {
  pub delivery_id: Option<String>,
  pub payload:     String,
  pub reason:      String,
  pub attempts:    u32,
  pub failed_at:   String,
}

impl RawDeadLetter {
  pub fn into_dead_letter(self) -> Result<DeadLetter> {
    Ok(DeadLetter {
      delivery_id: self
        .delivery_id
        .as_deref()
        .map(Uuid::parse_str)
        .transpose()?,
      raw:         self.payload,
      reason:      self.reason,
      attempts:    self.attempts,
      failed_at:   decode_dt(&self.failed_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let whole = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 5).unwrap();
    let later = whole + Duration::milliseconds(500);
    assert!(encode_dt(whole) < encode_dt(later));
    assert_eq!(encode_dt(whole).len(), encode_dt(later).len());
  }

  #[test]
  fn timestamp_round_trips_at_microsecond_precision() {
    let dt = Utc.with_ymd_and_hms(2026, 6, 30, 23, 59, 59).unwrap()
      + Duration::microseconds(123_456);
    assert_eq!(decode_dt(&encode_dt(dt)).unwrap(), dt);
  }
}
