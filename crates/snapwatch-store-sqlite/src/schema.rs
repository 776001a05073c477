//! SQL schema for the Snapwatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    username       TEXT PRIMARY KEY,
    password_hash  TEXT NOT NULL,   -- argon2 PHC string
    created_at     TEXT NOT NULL    -- ISO 8601 UTC
);

-- `seq` preserves insertion order for display.
-- Owners are not foreign keys: the store is usable before any account exists.
CREATE TABLE IF NOT EXISTS subscriptions (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    owner          TEXT NOT NULL,
    identity       TEXT NOT NULL,
    subscribed_at  TEXT NOT NULL,
    UNIQUE (owner, identity)
);

CREATE INDEX IF NOT EXISTS subscriptions_owner_idx ON subscriptions(owner);

PRAGMA user_version = 1;
";
