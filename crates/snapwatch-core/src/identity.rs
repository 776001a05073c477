//! Identity validation.
//!
//! Identities are joined into a single comma-separated argument for the fetch
//! tool and used verbatim as a directory name under the media root, so both
//! separators are forbidden.

use crate::{Error, Result};

const MAX_IDENTITY_LEN: usize = 128;

/// Check that `identity` is safe to pass to the fetch tool and to use as a
/// media directory name.
pub fn validate_identity(identity: &str) -> Result<()> {
  let fail = |why| Err(Error::InvalidIdentity(identity.to_owned(), why));

  if identity.is_empty() {
    return fail("must not be empty");
  }
  if identity.len() > MAX_IDENTITY_LEN {
    return fail("must be at most 128 characters");
  }
  if identity == "." || identity == ".." {
    return fail("must not be a relative path component");
  }
  if identity.contains(',') {
    return fail("must not contain ','");
  }
  if identity.contains(['/', '\\']) {
    return fail("must not contain a path separator");
  }
  if identity.chars().any(|c| c.is_whitespace() || c.is_control()) {
    return fail("must not contain whitespace");
  }
  Ok(())
}

/// Validate every identity, returning the first failure.
pub fn validate_all(identities: &[String]) -> Result<()> {
  identities.iter().try_for_each(|i| validate_identity(i))
}
