//! `POST /users/add`, `POST /users/remove`, `GET /subscriptions`.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use snapwatch_core::identity::validate_all;
use snapwatch_monitor::FetchRunner;

use super::store_err;
use crate::{AppState, Backend, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SnapUsers {
  pub snap_users: Vec<String>,
}

impl SnapUsers {
  /// Trimmed and validated identities, in request order.
  fn into_identities(self) -> Result<Vec<String>, ApiError> {
    let identities: Vec<String> = self
      .snap_users
      .into_iter()
      .map(|s| s.trim().to_owned())
      .collect();
    validate_all(&identities)?;
    Ok(identities)
  }
}

/// Subscribe, fetch the new identities once, and make sure the owner's
/// monitor is running with the configured defaults. A monitor started here
/// waits for the one-shot fetch before its first cycle.
pub async fn add<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(owner): Authenticated,
  Json(req): Json<SnapUsers>,
) -> Result<Json<Value>, ApiError>
where
  S: Backend,
  R: FetchRunner,
{
  let identities = req.into_identities()?;

  let added = state
    .store
    .add_subscriptions(owner.clone(), identities)
    .await
    .map_err(store_err)?;

  let outcome = state.scheduler.fetch_then_ensure_started(
    &owner,
    added.clone(),
    state.config.default_options(),
  );

  tracing::info!(
    owner = %owner,
    added = %added.join(","),
    already_running = outcome.already_running,
    "subscriptions added"
  );
  Ok(Json(json!({
    "msg": format!("added {} snap user(s); monitoring", added.len()),
    "added": added,
  })))
}

pub async fn remove<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(owner): Authenticated,
  Json(req): Json<SnapUsers>,
) -> Result<Json<Value>, ApiError>
where
  S: Backend,
  R: FetchRunner,
{
  let identities = req.into_identities()?;

  let removed = state
    .store
    .remove_subscriptions(owner.clone(), identities)
    .await
    .map_err(store_err)?;

  tracing::info!(owner = %owner, removed = %removed.join(","), "subscriptions removed");
  Ok(Json(json!({
    "msg": format!("removed {} snap user(s)", removed.len()),
    "removed": removed,
  })))
}

pub async fn list<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(owner): Authenticated,
) -> Result<Json<Value>, ApiError>
where
  S: Backend,
  R: FetchRunner,
{
  let subscriptions = state
    .store
    .list_subscriptions(owner)
    .await
    .map_err(store_err)?;

  Ok(Json(json!({ "subscriptions": subscriptions })))
}
