//! In-process fakes for the store and the fetch tool.

use std::{
  collections::HashMap,
  io,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use snapwatch_core::store::SubscriptionStore;
use tokio::sync::mpsc;

use crate::{FetchCommand, FetchError, FetchRunner};

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
  subs:   Mutex<HashMap<String, Vec<String>>>,
  broken: bool,
}

impl MemoryStore {
  /// A store whose every read fails.
  pub fn broken() -> Self { Self { broken: true, ..Self::default() } }

  pub fn subscribe(&self, owner: &str, identities: &[&str]) {
    let mut subs = self.subs.lock().unwrap();
    let list = subs.entry(owner.to_owned()).or_default();
    for id in identities {
      if !list.iter().any(|s| s == id) {
        list.push(id.to_string());
      }
    }
  }
}

impl SubscriptionStore for MemoryStore {
  type Error = io::Error;

  async fn add_subscriptions(&self, owner: String, identities: Vec<String>) -> io::Result<Vec<String>> {
    let mut subs = self.subs.lock().unwrap();
    let list = subs.entry(owner).or_default();
    let mut added = Vec::new();
    for id in identities {
      if !list.contains(&id) {
        list.push(id.clone());
        added.push(id);
      }
    }
    Ok(added)
  }

  async fn remove_subscriptions(&self, owner: String, identities: Vec<String>) -> io::Result<Vec<String>> {
    let mut subs = self.subs.lock().unwrap();
    let list = subs.entry(owner).or_default();
    let removed: Vec<String> = identities.into_iter().filter(|id| list.contains(id)).collect();
    list.retain(|id| !removed.contains(id));
    Ok(removed)
  }

  async fn list_subscriptions(&self, owner: String) -> io::Result<Vec<String>> {
    if self.broken {
      return Err(io::Error::other("store offline"));
    }
    Ok(self.subs.lock().unwrap().get(&owner).cloned().unwrap_or_default())
  }
}

// ─── Runner ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
  Succeed,
  Fail,
  Panic,
}

/// Forwards every command it is asked to run to a channel.
pub struct RecordingRunner {
  tx:   mpsc::UnboundedSender<FetchCommand>,
  mode: Mode,
}

impl RecordingRunner {
  fn with_mode(mode: Mode) -> (Self, mpsc::UnboundedReceiver<FetchCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx, mode }, rx)
  }

  pub fn new() -> (Self, mpsc::UnboundedReceiver<FetchCommand>) { Self::with_mode(Mode::Succeed) }

  /// Records the command, then reports a failure.
  pub fn failing() -> (Self, mpsc::UnboundedReceiver<FetchCommand>) { Self::with_mode(Mode::Fail) }

  /// Records the command, then panics.
  pub fn panicking() -> (Self, mpsc::UnboundedReceiver<FetchCommand>) { Self::with_mode(Mode::Panic) }
}

impl FetchRunner for RecordingRunner {
  async fn run<'a>(&'a self, command: &'a FetchCommand) -> Result<(), FetchError> {
    let _ = self.tx.send(command.clone());
    match self.mode {
      Mode::Succeed => Ok(()),
      Mode::Fail => Err(FetchError::Wait(io::Error::other("tool crashed"))),
      Mode::Panic => panic!("fetch tool exploded"),
    }
  }
}

/// Records each command, then takes `delay` to finish. Tracks how many runs
/// were in flight at once.
pub struct SlowRunner {
  tx:     mpsc::UnboundedSender<FetchCommand>,
  delay:  Duration,
  active: AtomicUsize,
  peak:   AtomicUsize,
}

impl SlowRunner {
  pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<FetchCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let runner = Self {
      tx,
      delay,
      active: AtomicUsize::new(0),
      peak: AtomicUsize::new(0),
    };
    (runner, rx)
  }

  /// Highest number of simultaneous runs seen so far.
  pub fn peak(&self) -> usize { self.peak.load(Ordering::SeqCst) }
}

impl FetchRunner for SlowRunner {
  async fn run<'a>(&'a self, command: &'a FetchCommand) -> Result<(), FetchError> {
    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    let _ = self.tx.send(command.clone());
    tokio::time::sleep(self.delay).await;
    self.active.fetch_sub(1, Ordering::SeqCst);
    Ok(())
  }
}
