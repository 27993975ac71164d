//! Development webhook subscriber.
//!
//! Accepts `POST /webhook`, logs the delivery headers and the JSON body, and
//! answers 200 so deliveries settle as `Delivered`.

use anyhow::Context as _;
use axum::{
  Json, Router,
  http::{HeaderMap, StatusCode},
  routing::post,
};
use clap::Parser;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Log every webhook geonotify delivers")]
struct Cli {
  /// Address to listen on.
  #[arg(short, long, default_value = "0.0.0.0:9090")]
  bind: String,
}

async fn receive(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, &'static str) {
  let header = |name: &str| {
    headers
      .get(name)
      .and_then(|v| v.to_str().ok())
      .unwrap_or("-")
      .to_owned()
  };
  info!(
    delivery_id = %header("x-geonotify-delivery"),
    attempt = %header("x-geonotify-attempt"),
    %body,
    "webhook received"
  );
  (StatusCode::OK, "ok")
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
  let app = Router::new().route("/webhook", post(receive));

  info!("webhook sink listening on http://{}/webhook", cli.bind);
  let listener = TcpListener::bind(&cli.bind)
    .await
    .with_context(|| format!("failed to bind {}", cli.bind))?;
  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
