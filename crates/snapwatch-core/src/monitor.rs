//! Monitor options and the read-only view of a running monitor loop.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Poll interval used when the caller does not specify one.
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Options a monitor loop is spawned with. Fixed for the lifetime of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorOptions {
  /// Seconds to sleep between fetch cycles.
  pub interval_secs: u64,
  /// Ask the fetch tool to archive downloads as zip files (`-z`).
  pub zip_it:        bool,
  /// Fetch highlights (`--highlights`).
  pub highlights:    bool,
  /// Fetch spotlights (`-s`).
  pub spotlights:    bool,
}

impl Default for MonitorOptions {
  fn default() -> Self {
    Self {
      interval_secs: DEFAULT_INTERVAL_SECS,
      zip_it:        false,
      highlights:    false,
      spotlights:    false,
    }
  }
}

impl MonitorOptions {
  pub fn with_interval_secs(interval_secs: u64) -> Self {
    Self { interval_secs, ..Self::default() }
  }

  pub fn interval(&self) -> Duration { Duration::from_secs(self.interval_secs) }

  /// Reject options a loop cannot run with.
  pub fn validate(&self) -> Result<()> {
    if self.interval_secs == 0 {
      return Err(Error::ZeroInterval);
    }
    Ok(())
  }
}

/// Snapshot of an owner's monitor loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
  pub owner:      String,
  /// `false` once the loop's task has ended (stopped or panicked).
  pub running:    bool,
  pub options:    MonitorOptions,
  pub started_at: DateTime<Utc>,
}

/// Result of asking the scheduler to ensure an owner's loop exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
  /// `true` if a loop was already running and nothing was spawned.
  pub already_running: bool,
  /// The options of the loop that is now running. When `already_running` is
  /// set these are the existing loop's options, not the requested ones.
  pub options:         MonitorOptions,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_polls_every_five_minutes_without_flags() {
    let o = MonitorOptions::default();
    assert_eq!(o.interval(), Duration::from_secs(300));
    assert!(!o.zip_it && !o.highlights && !o.spotlights);
  }

  #[test]
  fn zero_interval_is_rejected() {
    assert!(matches!(
      MonitorOptions::with_interval_secs(0).validate(),
      Err(Error::ZeroInterval)
    ));
    assert!(MonitorOptions::with_interval_secs(1).validate().is_ok());
  }
}
