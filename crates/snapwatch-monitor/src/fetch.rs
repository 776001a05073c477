//! Fetch invoker — one-shot and continuous calls to the external fetch tool.
//!
//! Command shapes:
//!
//! | Call | Arguments |
//! |------|-----------|
//! | one-shot | `-u <csv>` |
//! | poll cycle | `start -u <csv> [-z] [--highlights] [-s]` |
//!
//! A failed invocation is never propagated past this module: it is logged with
//! the owner and the identities and then dropped.

use std::{
  fmt,
  future::Future,
  path::PathBuf,
  process::Stdio,
  sync::Arc,
  time::Duration,
};

use snapwatch_core::{monitor::MonitorOptions, store::SubscriptionStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::FetchError;

// ─── Command ─────────────────────────────────────────────────────────────────

/// Argument list for one fetch tool invocation. Deterministic for a given
/// identity list and option set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCommand {
  args: Vec<String>,
}

impl FetchCommand {
  /// Immediate download of `identities`.
  pub fn once(identities: &[String]) -> Self {
    Self { args: vec!["-u".to_owned(), identities.join(",")] }
  }

  /// One cycle of continuous monitoring of `identities`.
  pub fn poll(identities: &[String], options: &MonitorOptions) -> Self {
    let mut args = vec!["start".to_owned(), "-u".to_owned(), identities.join(",")];
    if options.zip_it {
      args.push("-z".to_owned());
    }
    if options.highlights {
      args.push("--highlights".to_owned());
    }
    if options.spotlights {
      args.push("-s".to_owned());
    }
    Self { args }
  }

  pub fn args(&self) -> &[String] { &self.args }
}

impl fmt::Display for FetchCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.args.join(" "))
  }
}

// ─── Runner ──────────────────────────────────────────────────────────────────

/// Executes a [`FetchCommand`]. Success means the tool exited with status 0.
pub trait FetchRunner: Send + Sync + 'static {
  fn run<'a>(
    &'a self,
    command: &'a FetchCommand,
  ) -> impl Future<Output = Result<(), FetchError>> + Send + 'a;
}

/// Runs the fetch tool as a child process.
///
/// The child inherits stdout/stderr so the tool's own output lands in the
/// server log. It is killed if the invocation is cancelled or times out.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
  program:     PathBuf,
  /// Arguments placed before every [`FetchCommand`]'s own arguments.
  base_args:   Vec<String>,
  working_dir: Option<PathBuf>,
  timeout:     Option<Duration>,
}

impl ProcessRunner {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program:     program.into(),
      base_args:   Vec::new(),
      working_dir: None,
      timeout:     None,
    }
  }

  pub fn with_base_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.base_args = args.into_iter().map(Into::into).collect();
    self
  }

  /// Run the tool from `dir`; downloads land relative to it.
  pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_dir = Some(dir.into());
    self
  }

  /// Kill the tool if it runs longer than `limit`. Unbounded by default.
  pub fn with_timeout(mut self, limit: Duration) -> Self {
    self.timeout = Some(limit);
    self
  }
}

impl FetchRunner for ProcessRunner {
  async fn run<'a>(&'a self, command: &'a FetchCommand) -> Result<(), FetchError> {
    let mut cmd = tokio::process::Command::new(&self.program);
    cmd
      .args(&self.base_args)
      .args(command.args())
      .stdin(Stdio::null())
      .kill_on_drop(true);
    if let Some(dir) = &self.working_dir {
      cmd.current_dir(dir);
    }

    debug!(program = %self.program.display(), args = %command, "spawning fetch tool");

    let mut child = cmd.spawn().map_err(|source| FetchError::Launch {
      program: self.program.display().to_string(),
      source,
    })?;

    let status = match self.timeout {
      Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
        Ok(waited) => waited,
        Err(_) => {
          let _ = child.kill().await;
          return Err(FetchError::TimedOut(limit));
        }
      },
      None => child.wait().await,
    }
    .map_err(FetchError::Wait)?;

    if status.success() {
      Ok(())
    } else {
      Err(FetchError::Exit(status))
    }
  }
}

// ─── Invoker ─────────────────────────────────────────────────────────────────

/// What a single poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
  /// The owner had no subscriptions; nothing was executed.
  Skipped,
  Fetched,
  /// The fetch tool failed; logged and absorbed.
  FetchFailed,
  /// The subscription list could not be read; logged and absorbed.
  StoreFailed,
}

/// The two entry points to the fetch tool, bound to one [`FetchRunner`].
///
/// Cloning is cheap — the runner is reference-counted.
pub struct FetchInvoker<R> {
  runner: Arc<R>,
}

impl<R> Clone for FetchInvoker<R> {
  fn clone(&self) -> Self { Self { runner: Arc::clone(&self.runner) } }
}

impl<R: FetchRunner> FetchInvoker<R> {
  pub fn new(runner: Arc<R>) -> Self { Self { runner } }

  /// Fetch `identities` once. Best effort: failures are logged, never returned.
  /// Returns `true` if the tool ran and succeeded.
  pub async fn fetch_once(&self, owner: &str, identities: &[String]) -> bool {
    if identities.is_empty() {
      return false;
    }
    let command = FetchCommand::once(identities);
    match self.runner.run(&command).await {
      Ok(()) => {
        info!(owner, identities = %identities.join(","), "one-shot fetch finished");
        true
      }
      Err(e) => {
        warn!(owner, identities = %identities.join(","), error = %e, "one-shot fetch failed");
        false
      }
    }
  }

  /// Run one poll cycle against the owner's current subscriptions.
  pub async fn run_cycle<S: SubscriptionStore>(
    &self,
    owner:   &str,
    store:   &S,
    options: &MonitorOptions,
  ) -> CycleOutcome {
    let identities = match store.list_subscriptions(owner.to_owned()).await {
      Ok(ids) => ids,
      Err(e) => {
        warn!(owner, error = %e, "cannot read subscriptions; skipping cycle");
        return CycleOutcome::StoreFailed;
      }
    };
    if identities.is_empty() {
      debug!(owner, "no subscriptions; skipping cycle");
      return CycleOutcome::Skipped;
    }

    let command = FetchCommand::poll(&identities, options);
    match self.runner.run(&command).await {
      Ok(()) => {
        debug!(owner, args = %command, "poll cycle finished");
        CycleOutcome::Fetched
      }
      Err(e) => {
        warn!(owner, args = %command, error = %e, "poll cycle failed");
        CycleOutcome::FetchFailed
      }
    }
  }

  /// Poll until `cancel` fires: run a cycle, then sleep `options.interval()`.
  ///
  /// Subscriptions are re-read every cycle, so changes made after the loop
  /// started are picked up on the next cycle. Cycles never overlap.
  pub async fn poll_forever<S: SubscriptionStore>(
    &self,
    owner:   &str,
    store:   &S,
    options: MonitorOptions,
    cancel:  CancellationToken,
  ) {
    info!(owner, interval_secs = options.interval_secs, "monitor loop started");

    loop {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => break,
        _ = self.run_cycle(owner, store, &options) => {}
      }
      tokio::select! {
        biased;
        _ = cancel.cancelled() => break,
        _ = tokio::time::sleep(options.interval()) => {}
      }
    }

    info!(owner, "monitor loop stopped");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{MemoryStore, RecordingRunner};

  fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
  }

  // ── Command shape ────────────────────────────────────────────────────────

  #[test]
  fn once_joins_identities_into_one_argument() {
    let cmd = FetchCommand::once(&ids(&["bob", "carol"]));
    assert_eq!(cmd.args(), ["-u", "bob,carol"]);
  }

  #[test]
  fn poll_without_flags() {
    let cmd = FetchCommand::poll(&ids(&["bob"]), &MonitorOptions::default());
    assert_eq!(cmd.args(), ["start", "-u", "bob"]);
  }

  #[test]
  fn poll_flags_have_fixed_order() {
    let options = MonitorOptions {
      interval_secs: 10,
      zip_it:        true,
      highlights:    true,
      spotlights:    true,
    };
    let cmd = FetchCommand::poll(&ids(&["bob", "carol"]), &options);
    assert_eq!(cmd.args(), ["start", "-u", "bob,carol", "-z", "--highlights", "-s"]);
    assert_eq!(cmd.to_string(), "start -u bob,carol -z --highlights -s");
  }

  #[test]
  fn poll_with_only_spotlights() {
    let options = MonitorOptions { spotlights: true, ..MonitorOptions::default() };
    let cmd = FetchCommand::poll(&ids(&["bob"]), &options);
    assert_eq!(cmd.args(), ["start", "-u", "bob", "-s"]);
  }

  // ── Invoker ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn fetch_once_runs_a_single_command() {
    let (runner, mut rx) = RecordingRunner::new();
    let invoker = FetchInvoker::new(Arc::new(runner));

    assert!(invoker.fetch_once("alice", &ids(&["bob", "carol"])).await);
    assert_eq!(rx.recv().await.unwrap().args(), ["-u", "bob,carol"]);
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn fetch_once_with_nothing_to_fetch_is_a_noop() {
    let (runner, mut rx) = RecordingRunner::new();
    let invoker = FetchInvoker::new(Arc::new(runner));

    assert!(!invoker.fetch_once("alice", &[]).await);
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn fetch_once_swallows_failures() {
    let (runner, mut rx) = RecordingRunner::failing();
    let invoker = FetchInvoker::new(Arc::new(runner));

    assert!(!invoker.fetch_once("alice", &ids(&["bob"])).await);
    assert!(rx.recv().await.is_some());
  }

  #[tokio::test]
  async fn cycle_reads_current_subscriptions() {
    let (runner, mut rx) = RecordingRunner::new();
    let invoker = FetchInvoker::new(Arc::new(runner));
    let store   = MemoryStore::default();
    let options = MonitorOptions { highlights: true, ..MonitorOptions::default() };

    assert_eq!(invoker.run_cycle("alice", &store, &options).await, CycleOutcome::Skipped);
    assert!(rx.try_recv().is_err());

    store.subscribe("alice", &["bob"]);
    assert_eq!(invoker.run_cycle("alice", &store, &options).await, CycleOutcome::Fetched);
    assert_eq!(rx.recv().await.unwrap().args(), ["start", "-u", "bob", "--highlights"]);
  }

  #[tokio::test]
  async fn cycle_reports_store_failure_without_fetching() {
    let (runner, mut rx) = RecordingRunner::new();
    let invoker = FetchInvoker::new(Arc::new(runner));
    let store   = MemoryStore::broken();

    let outcome = invoker
      .run_cycle("alice", &store, &MonitorOptions::default())
      .await;
    assert_eq!(outcome, CycleOutcome::StoreFailed);
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn poll_forever_returns_once_cancelled() {
    let (runner, _rx) = RecordingRunner::new();
    let invoker = FetchInvoker::new(Arc::new(runner));
    let store   = MemoryStore::default();
    let cancel  = CancellationToken::new();
    cancel.cancel();

    invoker
      .poll_forever("alice", &store, MonitorOptions::default(), cancel)
      .await;
  }

  // ── Process runner ───────────────────────────────────────────────────────

  #[cfg(unix)]
  #[tokio::test]
  async fn process_runner_passes_arguments_and_working_dir() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ProcessRunner::new("sh")
      .with_base_args(["-c", r#"echo "$@" > args.txt"#, "snapify"])
      .with_working_dir(dir.path());

    runner
      .run(&FetchCommand::poll(&ids(&["bob", "carol"]), &MonitorOptions {
        zip_it: true,
        ..MonitorOptions::default()
      }))
      .await
      .unwrap();

    let written = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert_eq!(written.trim(), "start -u bob,carol -z");
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn process_runner_reports_nonzero_exit() {
    let runner = ProcessRunner::new("sh").with_base_args(["-c", "exit 3", "snapify"]);
    let err = runner.run(&FetchCommand::once(&ids(&["bob"]))).await.unwrap_err();
    match err {
      FetchError::Exit(status) => assert_eq!(status.code(), Some(3)),
      other => panic!("unexpected: {other}"),
    }
  }

  #[tokio::test]
  async fn process_runner_reports_missing_program() {
    let runner = ProcessRunner::new("/nonexistent/snapwatch-fetch-tool");
    let err = runner.run(&FetchCommand::once(&ids(&["bob"]))).await.unwrap_err();
    assert!(matches!(err, FetchError::Launch { .. }), "{err}");
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn process_runner_kills_hung_tool() {
    let runner = ProcessRunner::new("sh")
      .with_base_args(["-c", "sleep 30", "snapify"])
      .with_timeout(Duration::from_millis(100));

    let started = std::time::Instant::now();
    let err = runner.run(&FetchCommand::once(&ids(&["bob"]))).await.unwrap_err();
    assert!(matches!(err, FetchError::TimedOut(_)), "{err}");
    assert!(started.elapsed() < Duration::from_secs(10));
  }
}
