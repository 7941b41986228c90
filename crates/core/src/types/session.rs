//! Session lifecycle types.

use serde::{Deserialize, Serialize};

/// Whether the client considers a user logged in.
///
/// There is no expiry and no token refresh: the state only changes on a
/// successful profile submission or login, and on explicit logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated,
}

impl SessionState {
    /// Derive the state from an identity being present and the logged-in
    /// marker being set. Either alone is `Anonymous`.
    #[must_use]
    pub const fn derive(has_identity: bool, marker: bool) -> Self {
        if has_identity && marker {
            Self::Authenticated
        } else {
            Self::Anonymous
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::Authenticated => f.write_str("authenticated"),
        }
    }
}

/// A geographic position as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_requires_both() {
        assert_eq!(SessionState::derive(true, true), SessionState::Authenticated);
        assert_eq!(SessionState::derive(true, false), SessionState::Anonymous);
        assert_eq!(SessionState::derive(false, true), SessionState::Anonymous);
        assert_eq!(SessionState::derive(false, false), SessionState::Anonymous);
    }

    #[test]
    fn test_coordinates_json_shape() {
        let coords = Coordinates {
            latitude: 52.5,
            longitude: 13.4,
        };
        let json = serde_json::to_value(coords).unwrap();
        assert_eq!(json, serde_json::json!({"latitude": 52.5, "longitude": 13.4}));
    }
}
