//! Handlers for `/incidents` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/incidents` | `?page` (default 1), `?page_size` (default 20); newest first |
//! | `POST`   | `/incidents` | Body: [`NewIncident`]; returns 201 + stored incident |
//! | `GET`    | `/incidents/stats` | Distinct users checked within the stats window |
//! | `GET`    | `/incidents/{id}` | 404 if not found |
//! | `PUT`    | `/incidents/{id}` | Body: [`IncidentUpdate`]; 404 if not found |
//! | `DELETE` | `/incidents/{id}` | Deactivates; 204, or 404 if not found |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use geonotify_core::{
  incident::{Incident, IncidentUpdate, NewIncident},
  store::{AuditLog, IncidentStore, Page},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppState, Backend, error::ApiError};

const MAX_PAGE_SIZE: u32 = 500;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub page:      Option<u32>,
  pub page_size: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IncidentPage {
  pub items:     Vec<Incident>,
  pub page:      u32,
  pub page_size: u32,
}

/// `GET /incidents[?page=<n>][&page_size=<n>]`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<IncidentPage>, ApiError> {
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  let page = Page {
    page:      params.page.unwrap_or(1),
    page_size: params.page_size.unwrap_or(20),
  };
  if page.page < 1 {
    return Err(ApiError::BadRequest("invalid page parameter".into()));
  }
  if page.page_size < 1 || page.page_size > MAX_PAGE_SIZE {
    return Err(ApiError::BadRequest("invalid page_size parameter".into()));
  }

  let items = state
    .store
    .list_incidents(page)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(IncidentPage { items, page: page.page, page_size: page.page_size }))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /incidents`: returns 201 + the stored [`Incident`].
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  body: Result<Json<NewIncident>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(input) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  input.validate()?;

  let incident = state
    .store
    .create_incident(input)
    .await
    .map_err(ApiError::store)?;

  info!(incident_id = incident.id, "incident created");
  Ok((StatusCode::CREATED, Json(incident)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /incidents/{id}`
pub async fn get_one<S: Backend>(
  State(state): State<AppState<S>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Incident>, ApiError> {
  let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let incident = state
    .store
    .get_incident(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("incident {id} not found")))?;
  Ok(Json(incident))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /incidents/{id}`: full replacement of the mutable fields.
pub async fn update<S: Backend>(
  State(state): State<AppState<S>>,
  id: Result<Path<i64>, PathRejection>,
  body: Result<Json<IncidentUpdate>, JsonRejection>,
) -> Result<Json<Incident>, ApiError> {
  let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let Json(update) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  update.validate()?;

  let incident = state
    .store
    .update_incident(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("incident {id} not found")))?;

  info!(incident_id = id, active = incident.active, "incident updated");
  Ok(Json(incident))
}

// ─── Deactivate ───────────────────────────────────────────────────────────────

/// `DELETE /incidents/{id}`: the row is kept, only `active` is cleared.
pub async fn deactivate<S: Backend>(
  State(state): State<AppState<S>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
  let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let found = state
    .store
    .deactivate_incident(id)
    .await
    .map_err(ApiError::store)?;

  if !found {
    return Err(ApiError::NotFound(format!("incident {id} not found")));
  }
  info!(incident_id = id, "incident deactivated");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Stats ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStats {
  pub user_count: u64,
}

/// `GET /incidents/stats`
pub async fn stats<S: Backend>(
  State(state): State<AppState<S>>,
) -> Result<Json<UserStats>, ApiError> {
  let since = Utc::now() - state.stats_window;
  let user_count = state
    .store
    .count_users_since(since)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(UserStats { user_count }))
}
