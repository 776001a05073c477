//! snapwatch-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `SNAPWATCH_*` environment variables, opens the SQLite store, and serves
//! the JSON API and the media mount over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use snapwatch_server::{AppState, ServerConfig};
use snapwatch_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Snapwatch media monitor server")]
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

  let mut server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  server_cfg
    .validate()
    .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.media_dir  = expand_tilde(&server_cfg.media_dir);
  server_cfg.fetch_workdir = server_cfg.fetch_workdir.as_deref().map(expand_tilde);

  std::fs::create_dir_all(&server_cfg.media_dir)
    .with_context(|| format!("failed to create media dir {:?}", server_cfg.media_dir))?;

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  let runner = server_cfg.process_runner();
  tracing::info!(
    tool = %server_cfg.fetch_tool.display(),
    media_dir = %server_cfg.media_dir.display(),
    "fetch tool configured"
  );

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(Arc::new(store), Arc::new(runner), server_cfg);
  let scheduler = Arc::clone(&state.scheduler);
  let app = snapwatch_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  scheduler.shutdown();
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
