//! `GET /monitor`, `POST /monitor/{start,restart,stop}`.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use snapwatch_core::monitor::MonitorOptions;
use snapwatch_monitor::FetchRunner;

use crate::{AppState, Backend, ServerConfig, auth::Authenticated, error::ApiError};

/// Query parameters accepted by `start` and `restart`.
#[derive(Debug, Default, Deserialize)]
pub struct StartParams {
  /// Seconds between cycles. Falls back to `default_interval_secs`.
  pub interval:   Option<u64>,
  #[serde(default)]
  pub zip_it:     bool,
  #[serde(default)]
  pub highlights: bool,
  #[serde(default)]
  pub spotlights: bool,
}

impl StartParams {
  fn into_options(self, config: &ServerConfig) -> Result<MonitorOptions, ApiError> {
    let options = MonitorOptions {
      interval_secs: self.interval.unwrap_or(config.default_interval_secs),
      zip_it:        self.zip_it,
      highlights:    self.highlights,
      spotlights:    self.spotlights,
    };
    options.validate()?;
    Ok(options)
  }
}

pub async fn start<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(owner): Authenticated,
  Query(params): Query<StartParams>,
) -> Result<Json<Value>, ApiError>
where
  S: Backend,
  R: FetchRunner,
{
  let options = params.into_options(&state.config)?;
  let outcome = state.scheduler.ensure_started(&owner, options);

  let msg = if outcome.already_running {
    "monitor already running"
  } else {
    "monitor started"
  };
  Ok(Json(json!({
    "msg": msg,
    "interval": outcome.options.interval_secs,
    "already_running": outcome.already_running,
  })))
}

pub async fn restart<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(owner): Authenticated,
  Query(params): Query<StartParams>,
) -> Result<Json<Value>, ApiError>
where
  S: Backend,
  R: FetchRunner,
{
  let options  = params.into_options(&state.config)?;
  let replaced = state.scheduler.restart(&owner, options);

  tracing::info!(owner = %owner, replaced, interval_secs = options.interval_secs, "monitor restarted");
  let msg = if replaced { "monitor restarted" } else { "monitor started" };
  Ok(Json(json!({ "msg": msg, "interval": options.interval_secs })))
}

pub async fn stop<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(owner): Authenticated,
) -> Json<Value>
where
  S: Backend,
  R: FetchRunner,
{
  let stopped = state.scheduler.stop(&owner);
  Json(json!({ "stopped": stopped }))
}

pub async fn status<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(owner): Authenticated,
) -> Json<Value>
where
  S: Backend,
  R: FetchRunner,
{
  match state.scheduler.status(&owner) {
    Some(status) => Json(json!({
      "running":    status.running,
      "options":    status.options,
      "started_at": status.started_at,
    })),
    None => Json(json!({ "running": false })),
  }
}
