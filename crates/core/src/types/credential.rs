//! Credential types.
//!
//! Type-safe wrappers for stored credential material.

use serde::{Deserialize, Serialize};

/// Stored password digest.
///
/// Holds the PHC-formatted output of the credential verifier. The plaintext
/// password is never stored; this value is only meaningful to the verifier
/// that produced it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap an encoded digest.
    #[must_use]
    pub const fn new(encoded: String) -> Self {
        Self(encoded)
    }

    /// Get the encoded digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordDigest([REDACTED])")
    }
}

impl AsRef<str> for PasswordDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for PasswordDigest {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl From<PasswordDigest> for String {
    fn from(digest: PasswordDigest) -> Self {
        digest.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_digest() {
        let digest = PasswordDigest::new("$argon2id$v=19$secret".to_string());
        let debug = format!("{digest:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
    }
}
