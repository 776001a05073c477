//! [`MonitorScheduler`] — owns every running per-owner poll loop.
//!
//! Each owner has at most one live loop. Starting is an atomic check-and-spawn
//! under a single mutex; the mutex is never held across an `.await`, so one
//! owner's loop sleeping or fetching never stalls the scheduler or another
//! owner's loop.
//!
//! A loop's options are fixed when it is spawned. [`MonitorScheduler::ensure_started`]
//! on an owner that already has a loop is a no-op; only the explicit
//! [`MonitorScheduler::restart`] replaces a loop's options.
//!
//! Handles live in memory only: after a process restart no loop runs until the
//! next start request for that owner.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use snapwatch_core::{
  monitor::{MonitorOptions, MonitorStatus, StartOutcome},
  store::SubscriptionStore,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::fetch::{FetchInvoker, FetchRunner};

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Scheduler-side record of one owner's loop.
struct MonitorHandle {
  options:    MonitorOptions,
  started_at: DateTime<Utc>,
  cancel:     CancellationToken,
  task:       JoinHandle<()>,
}

impl MonitorHandle {
  /// A loop whose task ended (e.g. it panicked) is no longer live.
  fn is_live(&self) -> bool { !self.task.is_finished() }

  fn status(&self, owner: &str) -> MonitorStatus {
    MonitorStatus {
      owner:      owner.to_owned(),
      running:    self.is_live(),
      options:    self.options,
      started_at: self.started_at,
    }
  }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

pub struct MonitorScheduler<S, R> {
  store:   Arc<S>,
  invoker: FetchInvoker<R>,
  handles: Mutex<HashMap<String, MonitorHandle>>,
}

impl<S, R> MonitorScheduler<S, R>
where
  S: SubscriptionStore + 'static,
  R: FetchRunner,
{
  pub fn new(store: Arc<S>, runner: Arc<R>) -> Self {
    Self {
      store,
      invoker: FetchInvoker::new(runner),
      handles: Mutex::new(HashMap::new()),
    }
  }

  fn handles(&self) -> MutexGuard<'_, HashMap<String, MonitorHandle>> {
    self.handles.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Make sure `owner` has a running loop.
  ///
  /// Spawns one with `options` if there is none. Otherwise does nothing and
  /// reports the existing loop's options; `options` is ignored.
  pub fn ensure_started(&self, owner: &str, options: MonitorOptions) -> StartOutcome {
    let mut handles = self.handles();

    if let Some(existing) = handles.get(owner).filter(|h| h.is_live()) {
      return StartOutcome { already_running: true, options: existing.options };
    }

    let handle = self.spawn_loop(owner, options, Vec::new());
    handles.insert(owner.to_owned(), handle);
    StartOutcome { already_running: false, options }
  }

  /// Fetch `identities` once and make sure `owner` has a running loop.
  ///
  /// A loop spawned here runs the one-shot fetch to completion before its
  /// first cycle, so the two never invoke the tool at the same time. If a
  /// loop is already running the one-shot fetch gets its own task.
  pub fn fetch_then_ensure_started(
    &self,
    owner:      &str,
    identities: Vec<String>,
    options:    MonitorOptions,
  ) -> StartOutcome {
    let mut handles = self.handles();

    if let Some(existing) = handles.get(owner).filter(|h| h.is_live()) {
      let outcome = StartOutcome { already_running: true, options: existing.options };
      if !identities.is_empty() {
        self.spawn_fetch_once(owner, identities);
      }
      return outcome;
    }

    let handle = self.spawn_loop(owner, options, identities);
    handles.insert(owner.to_owned(), handle);
    StartOutcome { already_running: false, options }
  }

  /// Replace `owner`'s loop (if any) with a fresh one using `options`.
  ///
  /// Returns `true` if a live loop was replaced.
  pub fn restart(&self, owner: &str, options: MonitorOptions) -> bool {
    let mut handles = self.handles();

    let replaced = match handles.remove(owner) {
      Some(old) => {
        old.cancel.cancel();
        old.is_live()
      }
      None => false,
    };

    let handle = self.spawn_loop(owner, options, Vec::new());
    handles.insert(owner.to_owned(), handle);
    replaced
  }

  /// Cancel `owner`'s loop. Returns `true` if a live loop was cancelled.
  ///
  /// The loop notices at its next await point: before the next cycle, during
  /// the fetch (the child process is killed), or during the sleep.
  pub fn stop(&self, owner: &str) -> bool {
    match self.handles().remove(owner) {
      Some(handle) => {
        handle.cancel.cancel();
        info!(owner, "monitor loop cancelled");
        handle.is_live()
      }
      None => false,
    }
  }

  /// Cancel every loop.
  pub fn shutdown(&self) {
    let drained: Vec<_> = self.handles().drain().collect();
    for (_, handle) in &drained {
      handle.cancel.cancel();
    }
    info!(loops = drained.len(), "all monitor loops cancelled");
  }

  pub fn status(&self, owner: &str) -> Option<MonitorStatus> {
    self.handles().get(owner).map(|h| h.status(owner))
  }

  /// Owners with a live loop, sorted.
  pub fn running_owners(&self) -> Vec<String> {
    let mut owners: Vec<String> = self
      .handles()
      .iter()
      .filter(|(_, h)| h.is_live())
      .map(|(owner, _)| owner.clone())
      .collect();
    owners.sort();
    owners
  }

  /// Fire-and-forget one-shot fetch of `identities` on its own task.
  pub fn spawn_fetch_once(&self, owner: &str, identities: Vec<String>) -> JoinHandle<bool> {
    let invoker = self.invoker.clone();
    let owner   = owner.to_owned();
    tokio::spawn(async move { invoker.fetch_once(&owner, &identities).await })
  }

  /// Spawn a loop that first fetches `initial` once (if non-empty), then polls.
  fn spawn_loop(&self, owner: &str, options: MonitorOptions, initial: Vec<String>) -> MonitorHandle {
    let cancel  = CancellationToken::new();
    let invoker = self.invoker.clone();
    let store   = Arc::clone(&self.store);
    let token   = cancel.clone();
    let name    = owner.to_owned();

    let task = tokio::spawn(async move {
      if !initial.is_empty() {
        tokio::select! {
          biased;
          _ = token.cancelled() => return,
          _ = invoker.fetch_once(&name, &initial) => {}
        }
      }
      invoker.poll_forever(&name, store.as_ref(), options, token).await;
    });

    MonitorHandle {
      options,
      started_at: Utc::now(),
      cancel,
      task,
    }
  }
}

impl<S, R> Drop for MonitorScheduler<S, R> {
  fn drop(&mut self) {
    let handles = self.handles.get_mut().unwrap_or_else(PoisonError::into_inner);
    for handle in handles.values() {
      handle.cancel.cancel();
    }
  }
}
