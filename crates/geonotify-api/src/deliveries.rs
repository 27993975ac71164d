//! Handler for `GET /deliveries/dead-letters`.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use geonotify_core::{payload::DeadLetter, queue::DeliveryQueue};
use serde::Deserialize;

use crate::{AppState, Backend, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct DeadLetterParams {
  pub limit: Option<u32>,
}

/// `GET /deliveries/dead-letters[?limit=<n>]`: newest first, at most 500.
pub async fn dead_letters<S: Backend>(
  State(state): State<AppState<S>>,
  params: Result<Query<DeadLetterParams>, QueryRejection>,
) -> Result<Json<Vec<DeadLetter>>, ApiError> {
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let limit = params.limit.unwrap_or(50).min(500);

  let letters = state
    .store
    .dead_letters(limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(letters))
}
