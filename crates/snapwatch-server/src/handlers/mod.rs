//! Axum handlers, one module per resource.

pub mod accounts;
pub mod gallery;
pub mod monitor;
pub mod subscriptions;

use crate::error::ApiError;

/// Wrap a backend error for the 500 response path.
pub(crate) fn store_err<E>(e: E) -> ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  ApiError::Store(Box::new(e))
}
