//! User identifier type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`UserId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UserIdError {
    /// The input is empty or whitespace-only.
    #[error("user id cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("user id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// The identity key of a session.
///
/// The backend keys quota, stored details and generated avatars by this
/// value, so it is always stored trimmed.
///
/// ## Constraints
///
/// - Surrounding whitespace is removed
/// - Length after trimming: 1-128 characters
///
/// ## Examples
///
/// ```
/// use avatar_studio_core::UserId;
///
/// let id = UserId::parse("  alice ").unwrap();
/// assert_eq!(id.as_str(), "alice");
///
/// assert!(UserId::parse("").is_err());
/// assert!(UserId::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Maximum length of a user id, in characters.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `UserId` from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or longer than
    /// [`Self::MAX_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, UserIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(UserIdError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(UserIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `UserId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let id = UserId::parse("  alice\t").unwrap();
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(UserId::parse(""), Err(UserIdError::Empty));
        assert_eq!(UserId::parse(" \n "), Err(UserIdError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(UserId::MAX_LENGTH + 1);
        assert!(matches!(
            UserId::parse(&long),
            Err(UserIdError::TooLong { .. })
        ));
        assert!(UserId::parse(&"a".repeat(UserId::MAX_LENGTH)).is_ok());
    }

    #[test]
    fn test_serde_rejects_blank() {
        let parsed: Result<UserId, _> = serde_json::from_str("\"   \"");
        assert!(parsed.is_err());

        let id: UserId = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"bob\"");
    }

    #[test]
    fn test_display() {
        let id = UserId::parse("carol").unwrap();
        assert_eq!(format!("{id}"), "carol");
    }
}
