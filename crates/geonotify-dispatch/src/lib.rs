//! The webhook dispatcher.
//!
//! Consumes [`DeliveryTask`](geonotify_core::payload::DeliveryTask)s from a
//! [`DeliveryQueue`](geonotify_core::queue::DeliveryQueue) and POSTs each
//! payload to the configured subscriber. Failed deliveries are retried with
//! exponential backoff by re-queueing, and parked in the dead-letter table
//! once they cannot succeed.
//!
//! ```rust,ignore
//! let cancel = CancellationToken::new();
//! let handles = spawn_replicas(store, &DispatcherConfig::new(url), 2, &cancel)?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod retry;
pub mod state;

pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, spawn_replicas};
pub use error::{DeliveryError, Error, Result};
pub use retry::RetryConfig;
pub use state::DeliveryState;
