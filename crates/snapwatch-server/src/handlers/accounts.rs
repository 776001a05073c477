//! `POST /register`.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use snapwatch_core::account::validate_username;
use snapwatch_monitor::FetchRunner;

use super::store_err;
use crate::{AppState, Backend, auth::hash_password, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
  pub username: String,
  pub password: String,
}

pub async fn register<S, R>(
  State(state): State<AppState<S, R>>,
  Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
  S: Backend,
  R: FetchRunner,
{
  validate_username(&req.username)?;
  if req.password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".to_string()));
  }

  let hash = hash_password(&req.password)?;
  let account = state
    .store
    .register(req.username.clone(), hash)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::Conflict(format!("username {:?} is taken", req.username)))?;

  tracing::info!(username = %account.username, "account registered");
  Ok((StatusCode::CREATED, Json(json!({ "username": account.username }))))
}
