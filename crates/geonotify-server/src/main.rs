//! geonotify server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `GEONOTIFY_*` environment variables, opens the SQLite store, starts the
//! webhook dispatchers and serves the JSON API until SIGINT/SIGTERM.
//!
//! ```text
//! GEONOTIFY_WEBHOOK_URL=http://localhost:9090/webhook \
//! GEONOTIFY_DISPATCHER__WORKERS=2 \
//!   cargo run -p geonotify-server --bin geonotify
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use geonotify_api::AppState;
use geonotify_dispatch::spawn_replicas;
use geonotify_server::{ServerConfig, app, expand_tilde};
use geonotify_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Geofenced incident notification service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("GEONOTIFY")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  // Dispatchers run until the shutdown token fires.
  let shutdown = CancellationToken::new();
  let dispatchers = spawn_replicas(
    store.clone(),
    &server_cfg.dispatcher_config(),
    server_cfg.dispatcher.workers,
    &shutdown,
  )
  .context("failed to start dispatchers")?;

  let state = AppState::new(store, server_cfg.stats_window());
  let address = server_cfg.address();

  info!(workers = dispatchers.len(), "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app(state))
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await
    .context("server error");

  // Stop the dispatchers even if the server failed.
  shutdown.cancel();
  for handle in dispatchers {
    if let Err(e) = handle.await {
      warn!(error = %e, "dispatcher task panicked");
    }
  }
  info!("shutdown complete");

  served
}

/// Resolves on SIGINT or SIGTERM, cancelling `token` on the way out.
async fn shutdown_signal(token: CancellationToken) {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      warn!(error = %e, "failed to listen for ctrl-c");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        warn!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {}
    _ = terminate => {}
  }

  info!("shutdown signal received");
  token.cancel();
}
