//! Error type for a single fetch tool invocation.

use std::{process::ExitStatus, time::Duration};

use thiserror::Error;

/// A failed fetch. Always recoverable: callers log it and carry on.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to launch {program}: {source}")]
  Launch {
    program: String,
    #[source]
    source:  std::io::Error,
  },

  #[error("failed waiting for fetch tool: {0}")]
  Wait(#[source] std::io::Error),

  #[error("fetch tool exited with {0}")]
  Exit(ExitStatus),

  #[error("fetch tool timed out after {0:?}")]
  TimedOut(Duration),
}
