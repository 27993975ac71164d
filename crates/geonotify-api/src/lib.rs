//! JSON REST API for geonotify.
//!
//! Exposes an axum [`Router`] backed by any [`Backend`]: something that is at
//! once an incident store, an audit log and a delivery queue. TLS, auth and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", geonotify_api::api_router(state))
//! ```

pub mod deliveries;
pub mod error;
pub mod incidents;
pub mod location;
pub mod system;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use geonotify_core::{
  queue::DeliveryQueue,
  store::{AuditLog, IncidentStore},
};

pub use error::ApiError;

/// Every capability the API needs from its storage backend.
pub trait Backend: IncidentStore + AuditLog + DeliveryQueue + 'static {}

impl<T> Backend for T where T: IncidentStore + AuditLog + DeliveryQueue + 'static {}

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:        Arc<S>,
  /// Look-back window for `GET /incidents/stats`.
  pub stats_window: chrono::Duration,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, stats_window: chrono::Duration) -> Self {
    Self { store, stats_window }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), stats_window: self.stats_window }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(state: AppState<S>) -> Router<()> {
  Router::new()
    // Location checks
    .route("/location/check", post(location::check::<S>))
    // Incidents
    .route("/incidents", get(incidents::list::<S>).post(incidents::create::<S>))
    .route("/incidents/stats", get(incidents::stats::<S>))
    .route(
      "/incidents/{id}",
      get(incidents::get_one::<S>)
        .put(incidents::update::<S>)
        .delete(incidents::deactivate::<S>),
    )
    // Operations
    .route("/system/health", get(system::health::<S>))
    .route("/deliveries/dead-letters", get(deliveries::dead_letters::<S>))
    .with_state(state)
}
