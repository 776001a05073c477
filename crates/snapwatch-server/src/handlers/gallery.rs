//! `GET /gallery`.

use axum::{Json, extract::State};
use serde_json::{Value, json};
use snapwatch_core::gallery::list_gallery;
use snapwatch_monitor::FetchRunner;

use super::store_err;
use crate::{AppState, Backend, auth::Authenticated, error::ApiError};

pub async fn handler<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(owner): Authenticated,
) -> Result<Json<Value>, ApiError>
where
  S: Backend,
  R: FetchRunner,
{
  let identities = state
    .store
    .list_subscriptions(owner)
    .await
    .map_err(store_err)?;

  let config = state.config.clone();
  let gallery = tokio::task::spawn_blocking(move || {
    list_gallery(&config.media_dir, &config.media_url_prefix, &identities)
  })
  .await
  .map_err(|e| ApiError::Internal(format!("gallery task failed: {e}")))?;

  Ok(Json(json!({ "gallery": gallery })))
}
