//! `reqwest` implementation of [`AvatarBackend`].

use std::sync::Arc;
use std::time::Duration;

use avatar_studio_core::{GeneratedArtifact, UserId};
use serde::de::DeserializeOwned;
use url::Url;

use super::error_body::{describe_error_body, excerpt};
use super::types::decode_avatar_list;
use super::{ApiError, AvatarBackend, AvatarRequest, GeneratedImage, QuotaStatus, UserDetails};

/// HTTP client for the avatar backend.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpAvatarApi {
    inner: Arc<HttpAvatarApiInner>,
}

struct HttpAvatarApiInner {
    client: reqwest::Client,
    avatar_count: Url,
    store_user_avatar: Url,
    avatars: Url,
    store_user_details: Url,
}

impl HttpAvatarApi {
    /// Create a client for the backend at `base_url`.
    ///
    /// Every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or an endpoint URL
    /// cannot be derived from `base_url`.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("avatar-studio/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Make sure relative joins append to the base path instead of replacing its last segment
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(HttpAvatarApiInner {
                client,
                avatar_count: base.join("avatar-count")?,
                store_user_avatar: base.join("store-user-avatar")?,
                avatars: base.join("avatars")?,
                store_user_details: base.join("store-user-details")?,
            }),
        })
    }

    fn with_user(endpoint: &Url, user_id: &UserId) -> Url {
        let mut url = endpoint.clone();
        url.query_pairs_mut().append_pair("userId", user_id.as_str());
        url
    }
}

impl std::fmt::Debug for HttpAvatarApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAvatarApi")
            .field("avatar_count", &self.inner.avatar_count.as_str())
            .finish_non_exhaustive()
    }
}

/// Read a response body, mapping non-success statuses to a readable message
/// and shape mismatches to [`ApiError::MalformedResponse`].
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = describe_error_body(status.as_u16(), &body);
        tracing::warn!(status = status.as_u16(), %message, "Backend returned an error");
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| ApiError::MalformedResponse(format!("{e} (body: {})", excerpt(&body))))
}

impl AvatarBackend for HttpAvatarApi {
    async fn avatar_count(&self, user_id: &UserId) -> Result<QuotaStatus, ApiError> {
        let url = Self::with_user(&self.inner.avatar_count, user_id);
        tracing::debug!(%user_id, "Fetching remaining avatar count");
        let response = self.inner.client.get(url).send().await?;
        read_json(response).await
    }

    async fn generate_avatar(&self, request: &AvatarRequest) -> Result<GeneratedImage, ApiError> {
        tracing::debug!(user_id = %request.user_id, "Requesting avatar generation");
        let response = self
            .inner
            .client
            .post(self.inner.store_user_avatar.clone())
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    async fn list_avatars(&self, user_id: &UserId) -> Result<Vec<GeneratedArtifact>, ApiError> {
        let url = Self::with_user(&self.inner.avatars, user_id);
        tracing::debug!(%user_id, "Fetching avatar history");
        let response = self.inner.client.get(url).send().await?;
        read_json::<serde_json::Value>(response)
            .await
            .and_then(decode_avatar_list)
    }

    async fn store_user_details(
        &self,
        details: &UserDetails,
    ) -> Result<serde_json::Value, ApiError> {
        tracing::debug!(user_id = %details.user_id, "Storing user details");
        let response = self
            .inner
            .client
            .post(self.inner.store_user_details.clone())
            .json(details)
            .send()
            .await?;
        read_json(response).await
    }
}
