//! Study Partner backend entry point.
//!
//! - Axum HTTP + WebSocket API
//! - Gemini integration (server key via GEMINI_API_KEY, or per-request keys)
//!
//! Important env variables (see `config` for the full list):
//!   PORT            : u16 (default 3000)
//!   GEMINI_API_KEY  : default API key when callers send none
//!   GEMINI_MODEL    : default "gemini-2.5-flash"
//!   LOG_LEVEL       : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use study_partner::config::ServerConfig;
use study_partner::{build_router, telemetry, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // .env must be applied before LOG_LEVEL / LOG_FORMAT are read.
  let dotenv = dotenvy::dotenv();
  telemetry::init_tracing();
  if let Ok(path) = dotenv {
    info!(target: "study_partner", path = %path.display(), "Loaded .env");
  }
  let cfg = ServerConfig::from_env()?;

  // Shared, read-only application state (model client, prompts, policy).
  let state = Arc::new(AppState::new(&cfg)?);

  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "study_partner", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    info!(target: "study_partner", "Shutdown signal received");
  }
}
