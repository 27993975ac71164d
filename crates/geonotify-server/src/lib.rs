//! Process wiring for the geonotify service: configuration and the top-level
//! HTTP router. The binary in `main.rs` adds logging, the dispatcher
//! replicas and signal handling.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use axum::Router;
use geonotify_api::{AppState, Backend, api_router};
use geonotify_dispatch::{DispatcherConfig, RetryConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `GEONOTIFY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  pub webhook_url:          String,
  #[serde(default = "default_stats_window")]
  pub stats_window_minutes: i64,
  #[serde(default)]
  pub dispatcher:           DispatcherSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DispatcherSettings {
  /// Number of competing dispatcher replicas.
  pub workers:              usize,
  pub pop_timeout_secs:     u64,
  pub request_timeout_secs: u64,
  /// Retries after the first attempt; 0 delivers at most once.
  pub max_retries:          u32,
  pub initial_backoff_ms:   u64,
  pub max_backoff_ms:       u64,
}

impl Default for DispatcherSettings {
  fn default() -> Self {
    Self {
      workers:              1,
      pop_timeout_secs:     5,
      request_timeout_secs: 30,
      max_retries:          3,
      initial_backoff_ms:   2_000,
      max_backoff_ms:       60_000,
    }
  }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("geonotify.db") }
fn default_stats_window() -> i64 { 60 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn stats_window(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.stats_window_minutes)
  }

  pub fn dispatcher_config(&self) -> DispatcherConfig {
    let d = &self.dispatcher;
    DispatcherConfig {
      webhook_url:     self.webhook_url.clone(),
      pop_timeout:     Duration::from_secs(d.pop_timeout_secs),
      request_timeout: Duration::from_secs(d.request_timeout_secs),
      retry:           RetryConfig::new(
        d.max_retries,
        Duration::from_millis(d.initial_backoff_ms),
        Duration::from_millis(d.max_backoff_ms),
      ),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full HTTP application: the JSON API under `/api/v1`, with request
/// tracing.
pub fn app<S: Backend>(state: AppState<S>) -> Router {
  Router::new()
    .nest("/api/v1", api_router(state))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
