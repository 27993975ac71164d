//! [`SqliteStore`]: the SQLite implementation of the incident store and the
//! audit log. The delivery queue lives in [`crate::queue`].

use std::{path::Path, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tokio::sync::Notify;

use geonotify_core::{
  incident::{Incident, IncidentUpdate, NewIncident},
  location::LocationCheckAudit,
  store::{AuditLog, IncidentStore, Page, Storage},
};

use crate::{
  Error, Result,
  encode::{INCIDENT_COLUMNS, RawIncident, encode_dt, encode_ids},
  schema::SCHEMA,
};

/// How often a blocked dequeue re-checks the table when nothing wakes it.
/// Covers delayed retries and rows written by other processes.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A geonotify store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and the queue wake-up signal are
/// reference-counted, so clones share both.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn:          tokio_rusqlite::Connection,
  pub(crate) wakeup:        Arc<Notify>,
  pub(crate) poll_interval: Duration,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Override how often a blocked dequeue polls for eligible rows.
  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self {
      conn,
      wakeup: Arc::new(Notify::new()),
      poll_interval: DEFAULT_POLL_INTERVAL,
    };
    store
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(store)
  }

  async fn fetch_incident(&self, id: i64) -> Result<Option<Incident>> {
    let raw: Option<RawIncident> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"),
            rusqlite::params![id],
            RawIncident::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIncident::into_incident).transpose()
  }

  /// Every audit row in insertion order.
  #[cfg(test)]
  pub(crate) async fn audit_records(&self) -> Result<Vec<LocationCheckAudit>> {
    let raws: Vec<(i64, f64, f64, String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, latitude, longitude, incident_ids, checked_at
           FROM location_checks ORDER BY id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(user_id, latitude, longitude, ids, at)| {
        Ok(LocationCheckAudit {
          user_id,
          latitude,
          longitude,
          incident_ids: crate::encode::decode_ids(&ids)?,
          checked_at: crate::encode::decode_dt(&at)?,
        })
      })
      .collect()
  }
}

// ─── Storage impl ────────────────────────────────────────────────────────────

impl Storage for SqliteStore {
  type Error = Error;

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── IncidentStore impl ──────────────────────────────────────────────────────

impl IncidentStore for SqliteStore {
  async fn create_incident(&self, input: NewIncident) -> Result<Incident> {
    input.validate()?;

    let at_str = encode_dt(Utc::now());

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO incidents (
             title, description, latitude, longitude, radius_m, active,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
          rusqlite::params![
            input.title,
            input.description,
            input.latitude,
            input.longitude,
            input.radius_m,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    // Re-read so the returned timestamps carry the stored precision.
    self
      .fetch_incident(id)
      .await?
      .ok_or(Error::IncidentNotFound(id))
  }

  async fn get_incident(&self, id: i64) -> Result<Option<Incident>> {
    self.fetch_incident(id).await
  }

  async fn list_incidents(&self, page: Page) -> Result<Vec<Incident>> {
    let limit  = i64::from(page.page_size);
    let offset = page.offset() as i64;

    let raws: Vec<RawIncident> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {INCIDENT_COLUMNS} FROM incidents
           ORDER BY created_at DESC, id DESC
           LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawIncident::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIncident::into_incident).collect()
  }

  async fn update_incident(
    &self,
    id:     i64,
    update: IncidentUpdate,
  ) -> Result<Option<Incident>> {
    update.validate()?;

    let at_str = encode_dt(Utc::now());

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE incidents
           SET title = ?1, description = ?2, latitude = ?3, longitude = ?4,
               radius_m = ?5, active = ?6, updated_at = ?7
           WHERE id = ?8",
          rusqlite::params![
            update.title,
            update.description,
            update.latitude,
            update.longitude,
            update.radius_m,
            update.active,
            at_str,
            id,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_incident(id).await
  }

  async fn deactivate_incident(&self, id: i64) -> Result<bool> {
    let at_str = encode_dt(Utc::now());

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE incidents SET active = 0, updated_at = ?1 WHERE id = ?2",
          rusqlite::params![at_str, id],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn list_active_incidents(&self) -> Result<Vec<Incident>> {
    let raws: Vec<RawIncident> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE active = 1 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map([], RawIncident::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIncident::into_incident).collect()
  }
}

// ─── AuditLog impl ───────────────────────────────────────────────────────────

impl AuditLog for SqliteStore {
  async fn append_audit(&self, record: LocationCheckAudit) -> Result<()> {
    let ids_str = encode_ids(&record.incident_ids)?;
    let at_str  = encode_dt(record.checked_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO location_checks (user_id, latitude, longitude, incident_ids, checked_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            record.user_id,
            record.latitude,
            record.longitude,
            ids_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_users_since(&self, since: DateTime<Utc>) -> Result<u64> {
    let since_str = encode_dt(since);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(DISTINCT user_id) FROM location_checks WHERE checked_at >= ?1",
          rusqlite::params![since_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }
}
