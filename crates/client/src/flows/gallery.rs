//! Gallery of previously generated avatars.

use avatar_studio_core::GeneratedArtifact;

use crate::api::AvatarBackend;
use crate::error::{FlowError, Result};
use crate::session::SessionStore;

/// Shown when the user has no avatars yet.
pub const EMPTY_NOTICE: &str = "No avatars found for this user.";

/// What the gallery screen displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gallery {
    /// The backend has no avatars for this user. Not an error.
    Empty,
    /// Avatars in the order the backend returned them.
    Items(Vec<GeneratedArtifact>),
}

impl Gallery {
    /// Notice for the empty state.
    #[must_use]
    pub const fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Empty => Some(EMPTY_NOTICE),
            Self::Items(_) => None,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[GeneratedArtifact] {
        match self {
            Self::Empty => &[],
            Self::Items(items) => items,
        }
    }
}

/// Fetches the stored user's avatar history.
pub struct GalleryFetchFlow<'a, S, B> {
    store: &'a S,
    backend: &'a B,
}

impl<'a, S, B> GalleryFetchFlow<'a, S, B>
where
    S: SessionStore,
    B: AvatarBackend,
{
    #[must_use]
    pub const fn new(store: &'a S, backend: &'a B) -> Self {
        Self { store, backend }
    }

    /// # Errors
    ///
    /// Returns `FlowError::MissingIdentity` without a network call if no user
    /// id is stored, and `FlowError::Api` if the fetch fails. Not retried.
    pub async fn fetch(&self) -> Result<Gallery> {
        let user_id = self
            .store
            .load()
            .identity
            .map(|i| i.user_id)
            .ok_or(FlowError::MissingIdentity)?;

        let avatars = self.backend.list_avatars(&user_id).await?;
        tracing::debug!(%user_id, count = avatars.len(), "Fetched avatar history");

        Ok(if avatars.is_empty() {
            Gallery::Empty
        } else {
            Gallery::Items(avatars)
        })
    }
}
