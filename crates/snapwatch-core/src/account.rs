//! Account — a registered owner.
//!
//! Owners are created on registration and never deleted in-process. The
//! username doubles as the owner key for subscriptions and monitor loops.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Error, Result};

const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct Account {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Check that `username` is usable as an owner key.
pub fn validate_username(username: &str) -> Result<()> {
  let fail = |why| Err(Error::InvalidUsername(username.to_owned(), why));

  if username.is_empty() {
    return fail("must not be empty");
  }
  if username.len() > MAX_USERNAME_LEN {
    return fail("must be at most 64 characters");
  }
  if !username
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
  {
    return fail("may only contain letters, digits, '_', '.' and '-'");
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_plain_usernames() {
    assert!(validate_username("alice").is_ok());
    assert!(validate_username("bob_smith-2.0").is_ok());
  }

  #[test]
  fn rejects_empty_and_punctuation() {
    assert!(matches!(validate_username(""), Err(Error::InvalidUsername(..))));
    assert!(validate_username("alice:bob").is_err());
    assert!(validate_username("al ice").is_err());
    assert!(validate_username(&"a".repeat(65)).is_err());
  }

  #[test]
  fn password_hash_is_never_serialized() {
    let account = Account {
      username:      "alice".into(),
      password_hash: "$argon2id$secret".into(),
      created_at:    Utc::now(),
    };
    let json = serde_json::to_string(&account).unwrap();
    assert!(!json.contains("argon2"), "{json}");
  }
}
