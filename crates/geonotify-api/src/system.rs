//! Handler for `GET /system/health`.
//!
//! Always answers 200; a failing dependency turns `status` into `degraded`
//! and its field into the error text.

use axum::{Json, extract::State};
use geonotify_core::{queue::DeliveryQueue, store::Storage};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{AppState, Backend};

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
  pub status:      String,
  pub db:          String,
  pub queue:       String,
  pub queue_depth: Option<u64>,
}

/// `GET /system/health`
pub async fn health<S: Backend>(State(state): State<AppState<S>>) -> Json<Health> {
  let db = match state.store.ping().await {
    Ok(()) => "ok".to_owned(),
    Err(e) => {
      warn!(error = %e, "health: store ping failed");
      e.to_string()
    }
  };

  let (queue, queue_depth) = match state.store.depth().await {
    Ok(depth) => ("ok".to_owned(), Some(depth)),
    Err(e) => {
      warn!(error = %e, "health: queue depth failed");
      (e.to_string(), None)
    }
  };

  let status = if db == "ok" && queue == "ok" { "ok" } else { "degraded" };
  Json(Health { status: status.to_owned(), db, queue, queue_depth })
}
