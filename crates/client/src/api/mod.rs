//! Avatar backend REST client.
//!
//! # Endpoints
//!
//! - `GET /avatar-count?userId=<id>` - remaining generations
//! - `POST /store-user-avatar` - generate and store one avatar
//! - `GET /avatars?userId=<id>` - previously generated avatars
//! - `POST /store-user-details` - persist profile fields server-side
//!
//! The flows talk to the backend through [`AvatarBackend`] so they can be
//! driven by [`HttpAvatarApi`] in production and by in-process fakes in tests.

mod error_body;
mod http;
mod types;

pub use error_body::{ErrorDetail, FieldError, describe_error_body, excerpt};
pub use http::HttpAvatarApi;
pub use types::{AvatarRequest, GeneratedImage, QuotaStatus, UNKNOWN_COUNTRY, UserDetails};

use std::future::Future;
use std::sync::Arc;

use avatar_studio_core::{GeneratedArtifact, UserId};
use thiserror::Error;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request exceeded the configured timeout.
    #[error("the request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    ///
    /// `message` is already the human-readable rendering of the body.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response from server: {0}")]
    MalformedResponse(String),

    /// An endpoint URL could not be built from the base URL.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

impl ApiError {
    /// HTTP status of a non-success response, if that is what this is.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The backend operations the flows depend on.
pub trait AvatarBackend: Send + Sync {
    /// `GET /avatar-count`
    fn avatar_count(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<QuotaStatus, ApiError>> + Send;

    /// `POST /store-user-avatar`
    fn generate_avatar(
        &self,
        request: &AvatarRequest,
    ) -> impl Future<Output = Result<GeneratedImage, ApiError>> + Send;

    /// `GET /avatars`
    fn list_avatars(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<GeneratedArtifact>, ApiError>> + Send;

    /// `POST /store-user-details`; the acknowledgement is returned as-is.
    fn store_user_details(
        &self,
        details: &UserDetails,
    ) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;
}

impl<T: AvatarBackend + ?Sized> AvatarBackend for Arc<T> {
    fn avatar_count(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<QuotaStatus, ApiError>> + Send {
        (**self).avatar_count(user_id)
    }

    fn generate_avatar(
        &self,
        request: &AvatarRequest,
    ) -> impl Future<Output = Result<GeneratedImage, ApiError>> + Send {
        (**self).generate_avatar(request)
    }

    fn list_avatars(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<GeneratedArtifact>, ApiError>> + Send {
        (**self).list_avatars(user_id)
    }

    fn store_user_details(
        &self,
        details: &UserDetails,
    ) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send {
        (**self).store_user_details(details)
    }
}

impl<T: AvatarBackend + ?Sized> AvatarBackend for &T {
    fn avatar_count(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<QuotaStatus, ApiError>> + Send {
        (**self).avatar_count(user_id)
    }

    fn generate_avatar(
        &self,
        request: &AvatarRequest,
    ) -> impl Future<Output = Result<GeneratedImage, ApiError>> + Send {
        (**self).generate_avatar(request)
    }

    fn list_avatars(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<GeneratedArtifact>, ApiError>> + Send {
        (**self).list_avatars(user_id)
    }

    fn store_user_details(
        &self,
        details: &UserDetails,
    ) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send {
        (**self).store_user_details(details)
    }
}
