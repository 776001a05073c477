//! Error types for `snapwatch-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid identity {0:?}: {1}")]
  InvalidIdentity(String, &'static str),

  #[error("invalid username {0:?}: {1}")]
  InvalidUsername(String, &'static str),

  #[error("monitor interval must be at least 1 second")]
  ZeroInterval,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
