//! [`SqliteStore`] — the SQLite implementation of [`SubscriptionStore`] and
//! [`AccountStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use snapwatch_core::{
  account::Account,
  store::{AccountStore, SubscriptionStore},
};

use crate::{Error, Result, schema::SCHEMA};

// ─── Encoding ────────────────────────────────────────────────────────────────

fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Raw account row before timestamp decoding.
struct RawAccount {
  username:      String,
  password_hash: String,
  created_at:    String,
}

impl RawAccount {
  fn into_account(self) -> Result<Account> {
    Ok(Account {
      username:      self.username,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Snapwatch store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SubscriptionStore impl ──────────────────────────────────────────────────

impl SubscriptionStore for SqliteStore {
  type Error = Error;

  async fn add_subscriptions(
    &self,
    owner:      String,
    identities: Vec<String>,
  ) -> Result<Vec<String>> {
    let at_str = encode_dt(Utc::now());

    let added = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut added = Vec::new();
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO subscriptions (owner, identity, subscribed_at)
             VALUES (?1, ?2, ?3)",
          )?;
          for identity in identities {
            let inserted = stmt.execute(rusqlite::params![owner, identity, at_str])?;
            if inserted == 1 {
              added.push(identity);
            }
          }
        }
        tx.commit()?;
        Ok(added)
      })
      .await?;

    Ok(added)
  }

  async fn remove_subscriptions(
    &self,
    owner:      String,
    identities: Vec<String>,
  ) -> Result<Vec<String>> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = Vec::new();
        {
          let mut stmt = tx.prepare(
            "DELETE FROM subscriptions WHERE owner = ?1 AND identity = ?2",
          )?;
          for identity in identities {
            if stmt.execute(rusqlite::params![owner, identity])? == 1 {
              removed.push(identity);
            }
          }
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed)
  }

  async fn list_subscriptions(&self, owner: String) -> Result<Vec<String>> {
    let identities = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT identity FROM subscriptions WHERE owner = ?1 ORDER BY seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owner], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(identities)
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = Error;

  async fn register(&self, username: String, password_hash: String) -> Result<Option<Account>> {
    let account = Account {
      username,
      password_hash,
      created_at: Utc::now(),
    };

    let name_str = account.username.clone();
    let hash_str = account.password_hash.clone();
    let at_str   = encode_dt(account.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO accounts (username, password_hash, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![name_str, hash_str, at_str],
        )?)
      })
      .await?;

    Ok((inserted == 1).then_some(account))
  }

  async fn get_account(&self, username: String) -> Result<Option<Account>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT username, password_hash, created_at FROM accounts WHERE username = ?1",
            rusqlite::params![username],
            |row| {
              Ok(RawAccount {
                username:      row.get(0)?,
                password_hash: row.get(1)?,
                created_at:    row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }
}
