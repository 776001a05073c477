//! SQLite backend for Snapwatch subscriptions and accounts.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The single connection serialises every
//! call, which is what makes each mutation atomic with respect to the others.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
