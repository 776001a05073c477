//! The `SubscriptionStore` and `AccountStore` traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `snapwatch-store-sqlite`). Higher layers (`snapwatch-monitor`,
//! `snapwatch-server`) depend on these abstractions, not on any concrete
//! backend.

use std::future::Future;

use crate::account::Account;

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// Durable mapping of owner → subscribed identities.
///
/// Every `(owner, identity)` pair exists at most once. Mutations are atomic
/// with respect to each other; a backend must never lose an update when two
/// requests add or remove concurrently.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`) and from spawned poll loops.
pub trait SubscriptionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Subscribe `owner` to each identity it is not already subscribed to.
  ///
  /// Returns exactly the identities that were inserted, in request order.
  /// Identities already present (or repeated in `identities`) are skipped
  /// silently.
  fn add_subscriptions(
    &self,
    owner: String,
    identities: Vec<String>,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Unsubscribe `owner` from each identity. Returns only the identities that
  /// were actually subscribed beforehand.
  fn remove_subscriptions(
    &self,
    owner: String,
    identities: Vec<String>,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// All identities currently subscribed by `owner`, in insertion order.
  /// An owner with no subscriptions yields an empty list.
  fn list_subscriptions(
    &self,
    owner: String,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Registered owners and their password hashes.
pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new account. Returns `None`, leaving the existing account
  /// untouched, if `username` is already registered.
  fn register(
    &self,
    username: String,
    password_hash: String,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Look up an account by username. Returns `None` if not registered.
  fn get_account(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;
}
