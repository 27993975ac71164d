//! Error types for `geonotify-dispatch`.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a single delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
  /// Connection refused, DNS failure, timeout...
  #[error("transport error: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("subscriber answered {0}")]
  Status(StatusCode),
}

impl DeliveryError {
  /// Transport failures, 429 and 5xx may succeed later; any other non-2xx
  /// answer will not.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Transport(_) => true,
      Self::Status(status) => {
        *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
      }
    }
  }
}

/// An error that stops one iteration of the dispatcher loop.
#[derive(Debug, Error)]
pub enum Error {
  #[error("http client error: {0}")]
  Client(#[from] reqwest::Error),

  #[error("queue error: {0}")]
  Queue(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn queue<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Queue(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
