//! HTTP surface for Snapwatch.
//!
//! Exposes an axum [`Router`] over any storage backend implementing both
//! [`SubscriptionStore`] and [`AccountStore`], and any [`FetchRunner`].
//!
//! | Method | Path | Auth | Notes |
//! |--------|------|------|-------|
//! | `POST` | `/register` | no | Body: `{"username":..,"password":..}` |
//! | `POST` | `/users/add` | yes | Body: `{"snap_users":[..]}`; starts a one-shot fetch and the owner's monitor |
//! | `POST` | `/users/remove` | yes | Body: `{"snap_users":[..]}` |
//! | `GET`  | `/subscriptions` | yes | |
//! | `GET`  | `/gallery` | yes | |
//! | `GET`  | `/monitor` | yes | |
//! | `POST` | `/monitor/start` | yes | `?interval&zip_it&highlights&spotlights` |
//! | `POST` | `/monitor/restart` | yes | same parameters |
//! | `POST` | `/monitor/stop` | yes | |
//! | `GET`  | `<media_url_prefix>/*` | no | downloaded media files |

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use snapwatch_core::{
  monitor::{DEFAULT_INTERVAL_SECS, MonitorOptions},
  store::{AccountStore, SubscriptionStore},
};
use snapwatch_monitor::{FetchRunner, MonitorScheduler, ProcessRunner};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use handlers::{accounts, gallery, monitor, subscriptions};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SNAPWATCH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  #[serde(default = "default_store_path")]
  pub store_path:            PathBuf,
  /// Root of the downloaded media tree.
  #[serde(default = "default_media_dir")]
  pub media_dir:             PathBuf,
  /// URL path `media_dir` is served under.
  #[serde(default = "default_media_url_prefix")]
  pub media_url_prefix:      String,
  /// Fetch tool executable.
  #[serde(default = "default_fetch_tool")]
  pub fetch_tool:            PathBuf,
  /// Arguments placed before every fetch command's own arguments.
  #[serde(default)]
  pub fetch_tool_args:       Vec<String>,
  /// Directory the fetch tool runs in. Defaults to the server's own.
  #[serde(default)]
  pub fetch_workdir:         Option<PathBuf>,
  /// Kill a fetch that runs longer than this. Unbounded when unset.
  #[serde(default)]
  pub fetch_timeout_secs:    Option<u64>,
  /// Poll interval for monitors started implicitly by `/users/add` and for
  /// `/monitor/start` without `interval`.
  #[serde(default = "default_interval_secs")]
  pub default_interval_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8000 }
fn default_store_path() -> PathBuf { PathBuf::from("snapwatch.db") }
fn default_media_dir() -> PathBuf { PathBuf::from("snap_media") }
fn default_media_url_prefix() -> String { "/snap_media".to_string() }
fn default_fetch_tool() -> PathBuf { PathBuf::from("snapify") }
fn default_interval_secs() -> u64 { DEFAULT_INTERVAL_SECS }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  default_host(),
      port:                  default_port(),
      store_path:            default_store_path(),
      media_dir:             default_media_dir(),
      media_url_prefix:      default_media_url_prefix(),
      fetch_tool:            default_fetch_tool(),
      fetch_tool_args:       Vec::new(),
      fetch_workdir:         None,
      fetch_timeout_secs:    None,
      default_interval_secs: default_interval_secs(),
    }
  }
}

impl ServerConfig {
  /// Layer `path` (optional) and the process environment over the defaults.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::load_with(path, env_source())
  }

  fn load_with(path: &Path, env: config::Environment) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  /// Reject settings the server cannot run with.
  pub fn validate(&self) -> Result<(), String> {
    let prefix = &self.media_url_prefix;
    if !prefix.starts_with('/') || prefix == "/" || prefix.ends_with('/') {
      return Err(format!(
        "media_url_prefix must look like \"/snap_media\", got {prefix:?}"
      ));
    }
    if self.default_interval_secs == 0 {
      return Err("default_interval_secs must be at least 1".to_string());
    }
    if self.fetch_timeout_secs == Some(0) {
      return Err("fetch_timeout_secs must be at least 1 when set".to_string());
    }
    Ok(())
  }

  /// Options for monitors started without explicit parameters.
  pub fn default_options(&self) -> MonitorOptions {
    MonitorOptions::with_interval_secs(self.default_interval_secs)
  }

  /// The fetch tool runner described by this configuration.
  pub fn process_runner(&self) -> ProcessRunner {
    let mut runner = ProcessRunner::new(&self.fetch_tool)
      .with_base_args(self.fetch_tool_args.iter().cloned());
    if let Some(dir) = &self.fetch_workdir {
      runner = runner.with_working_dir(dir);
    }
    if let Some(secs) = self.fetch_timeout_secs {
      runner = runner.with_timeout(Duration::from_secs(secs));
    }
    runner
  }
}

/// `SNAPWATCH_*` variables. `SNAPWATCH_FETCH_TOOL_ARGS` is split on spaces.
fn env_source() -> config::Environment {
  config::Environment::with_prefix("SNAPWATCH")
    .try_parsing(true)
    .list_separator(" ")
    .with_list_parse_key("fetch_tool_args")
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the server needs from a storage backend.
pub trait Backend: SubscriptionStore + AccountStore + 'static {}

impl<T: SubscriptionStore + AccountStore + 'static> Backend for T {}

/// Shared state threaded through all axum handlers.
pub struct AppState<S, R> {
  pub store:     Arc<S>,
  pub scheduler: Arc<MonitorScheduler<S, R>>,
  pub config:    Arc<ServerConfig>,
}

impl<S, R> Clone for AppState<S, R> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      scheduler: Arc::clone(&self.scheduler),
      config:    Arc::clone(&self.config),
    }
  }
}

impl<S: Backend, R: FetchRunner> AppState<S, R> {
  /// Wire a store and a runner into a fresh scheduler.
  pub fn new(store: Arc<S>, runner: Arc<R>, config: ServerConfig) -> Self {
    let scheduler = MonitorScheduler::new(Arc::clone(&store), runner);
    Self {
      store,
      scheduler: Arc::new(scheduler),
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the Snapwatch server.
pub fn router<S, R>(state: AppState<S, R>) -> Router
where
  S: Backend,
  R: FetchRunner,
{
  let media = ServeDir::new(&state.config.media_dir);
  let prefix = state.config.media_url_prefix.clone();

  Router::new()
    .route("/register",        post(accounts::register::<S, R>))
    .route("/users/add",       post(subscriptions::add::<S, R>))
    .route("/users/remove",    post(subscriptions::remove::<S, R>))
    .route("/subscriptions",   get(subscriptions::list::<S, R>))
    .route("/gallery",         get(gallery::handler::<S, R>))
    .route("/monitor",         get(monitor::status::<S, R>))
    .route("/monitor/start",   post(monitor::start::<S, R>))
    .route("/monitor/restart", post(monitor::restart::<S, R>))
    .route("/monitor/stop",    post(monitor::stop::<S, R>))
    .nest_service(&prefix, media)
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
