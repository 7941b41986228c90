//! Flow-boundary error handling.
//!
//! Every flow returns [`FlowError`]. Front ends never inspect the variants to
//! build their own text; [`FlowError::user_message`] is the one place an error
//! becomes the string shown to the user.

use avatar_studio_core::{GENERATION_LIMIT, UserIdError};
use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::session::SessionError;

const INCOMPLETE_PROFILE: &str = "User profile data is incomplete. \
    Please go back to your profile and fill in all details.";

/// Input rejected before any network call.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is empty or whitespace-only.
    #[error("{0} is required")]
    EmptyField(&'static str),

    /// The user id is not acceptable.
    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] UserIdError),
}

/// Errors surfaced by the flows.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Form input failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Profile fields the backend requires are missing.
    #[error("profile incomplete, missing: {}", .missing.join(", "))]
    IncompleteProfile { missing: Vec<&'static str> },

    /// The advisory quota counter is at zero.
    #[error("generation limit ({limit}) reached")]
    QuotaExceeded { limit: u32 },

    /// No user id is stored in the session.
    #[error("no user id in session")]
    MissingIdentity,

    /// A generation request is already in flight.
    #[error("a request is already pending")]
    RequestPending,

    /// User id or password did not match the stored identity.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Backend call failed.
    #[error("backend error: {0}")]
    Api(#[from] ApiError),

    /// Session storage could not be written.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Credential enrollment failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
}

impl FlowError {
    /// The single human-readable message for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(ValidationError::EmptyField(_)) => {
                "Please enter all your Details.".to_string()
            }
            Self::Validation(ValidationError::InvalidUserId(e)) => format!("Invalid user ID: {e}."),
            Self::IncompleteProfile { .. } => INCOMPLETE_PROFILE.to_string(),
            Self::QuotaExceeded { limit } => format!("You've reached your {limit}-image limit."),
            Self::MissingIdentity => "User ID missing. Please complete your profile.".to_string(),
            Self::RequestPending => "Please wait for the current request to finish.".to_string(),
            Self::InvalidCredentials => "Invalid name or password. Please register.".to_string(),
            Self::Api(ApiError::Timeout) => {
                "The server took too long to respond. Please try again.".to_string()
            }
            Self::Api(ApiError::Transport(_)) => {
                "Could not reach the server. Please check your connection.".to_string()
            }
            // Status bodies are already rendered into a readable message
            Self::Api(err) => err.to_string(),
            Self::Session(_) => "Could not save your session on this device.".to_string(),
            Self::Auth(_) => "Could not process your password.".to_string(),
        }
    }

    /// Whether this error is a failure of the local machine or the service
    /// rather than of user input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Session(_) | Self::Auth(_))
    }
}

impl From<UserIdError> for FlowError {
    fn from(err: UserIdError) -> Self {
        Self::Validation(ValidationError::InvalidUserId(err))
    }
}

/// Error used when the counter blocks a request.
pub(crate) const fn quota_exceeded() -> FlowError {
    FlowError::QuotaExceeded {
        limit: GENERATION_LIMIT,
    }
}

/// Result type alias for `FlowError`.
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_surface_verbatim() {
        let err = FlowError::from(ApiError::Status {
            status: 422,
            message: "body.prompt - field required".to_string(),
        });
        let message = err.user_message();
        assert!(message.contains("prompt"));
        assert!(message.contains("field required"));
    }

    #[test]
    fn test_quota_message() {
        assert_eq!(
            quota_exceeded().user_message(),
            "You've reached your 10-image limit."
        );
    }

    #[test]
    fn test_missing_identity_message() {
        assert_eq!(
            FlowError::MissingIdentity.user_message(),
            "User ID missing. Please complete your profile."
        );
    }

    #[test]
    fn test_incomplete_profile_lists_fields_in_display() {
        let err = FlowError::IncompleteProfile {
            missing: vec!["gender", "occupation"],
        };
        assert_eq!(err.to_string(), "profile incomplete, missing: gender, occupation");
        assert!(err.user_message().starts_with("User profile data is incomplete."));
    }
}
