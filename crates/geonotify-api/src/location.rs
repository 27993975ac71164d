//! Handler for `POST /location/check`.
//!
//! Body: `{"user_id": 7, "latitude": 52.0, "longitude": 52.05}`.
//! Returns the request echoed back with `locations_ids`, the incidents the
//! point falls inside. 400 on a malformed body or a non-positive `user_id`,
//! 500 when the store or queue is unavailable.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use geonotify_core::{
  check::check_location,
  location::{LocationCheckRequest, LocationCheckResponse},
};
use tracing::info;

use crate::{AppState, Backend, error::ApiError};

/// `POST /location/check`
pub async fn check<S: Backend>(
  State(state): State<AppState<S>>,
  body: Result<Json<LocationCheckRequest>, JsonRejection>,
) -> Result<Json<LocationCheckResponse>, ApiError> {
  let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  let store = state.store.as_ref();
  let response = check_location(store, store, store, request).await?;

  info!(
    user_id = response.user_id,
    matched = response.locations_ids.len(),
    "location checked"
  );
  Ok(Json(response))
}
