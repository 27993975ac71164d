//! Error types for `geonotify-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid user_id: {0}")]
  InvalidUserId(i64),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("incident store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("enqueue failed: {0}")]
  EnqueueFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// `true` for errors caused by the caller's input rather than a dependency.
  pub fn is_client_error(&self) -> bool {
    matches!(self, Self::InvalidUserId(_) | Self::Validation(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
