//! Profile submission.
//!
//! Registration saves the profile locally, marks the session authenticated
//! and then persists the profile server-side. The two persistence steps fail
//! independently: a remote failure does not undo the local save, and it is
//! returned to the caller rather than dropped.

use avatar_studio_core::{Profile, SessionState, UserId};
use secrecy::SecretString;

use super::enroll_optional;
use crate::api::{ApiError, AvatarBackend, UserDetails};
use crate::auth::CredentialVerifier;
use crate::error::{Result, ValidationError};
use crate::session::{Identity, SessionStore};

/// Everything the registration form collects.
#[derive(Debug)]
pub struct ProfileForm {
    pub user_id: String,
    /// May be empty, in which case no password is enrolled.
    pub password: SecretString,
    pub profile: Profile,
}

/// Outcome of the remote persistence step.
#[derive(Debug)]
pub enum RemoteSync {
    /// The backend acknowledged the profile.
    Persisted(serde_json::Value),
    /// The backend call failed; the local save still stands.
    Failed(ApiError),
}

impl RemoteSync {
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }
}

/// Result of a submission whose local save succeeded.
#[derive(Debug)]
pub struct ProfileSubmission {
    pub user_id: UserId,
    pub state: SessionState,
    pub remote: RemoteSync,
}

/// Validates and submits the registration form.
pub struct ProfileSubmissionFlow<'a, S, B, V> {
    store: &'a S,
    backend: &'a B,
    verifier: &'a V,
}

impl<'a, S, B, V> ProfileSubmissionFlow<'a, S, B, V>
where
    S: SessionStore,
    B: AvatarBackend,
    V: CredentialVerifier,
{
    #[must_use]
    pub const fn new(store: &'a S, backend: &'a B, verifier: &'a V) -> Self {
        Self {
            store,
            backend,
            verifier,
        }
    }

    /// Check the form without side effects.
    ///
    /// The user id and both country fields must be non-empty after trimming.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(form: &ProfileForm) -> std::result::Result<UserId, ValidationError> {
        if form.user_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("userId"));
        }
        if form.profile.country_of_origin.trim().is_empty() {
            return Err(ValidationError::EmptyField("countryOfOrigin"));
        }
        if form.profile.country_of_occupation.trim().is_empty() {
            return Err(ValidationError::EmptyField("countryOfOccupation"));
        }
        Ok(UserId::parse(&form.user_id)?)
    }

    /// Validate, save locally, mark the session authenticated, then persist
    /// the profile on the backend.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Validation` before touching storage or the network,
    /// and `FlowError::Session`/`FlowError::Auth` if the local save fails.
    /// A backend failure is not an error here; see [`ProfileSubmission::remote`].
    pub async fn submit(&self, form: ProfileForm) -> Result<ProfileSubmission> {
        let user_id = Self::validate(&form)?;
        let profile = normalize(form.profile);
        let identity = Identity {
            user_id: user_id.clone(),
            password: enroll_optional(self.verifier, &form.password)?,
        };

        self.store.save(&identity, &profile)?;
        self.store.set_session_flag(true)?;
        tracing::info!(%user_id, "Profile saved locally");

        let remote = match self
            .backend
            .store_user_details(&UserDetails::new(&user_id, &profile))
            .await
        {
            Ok(ack) => RemoteSync::Persisted(ack),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to persist profile on backend");
                RemoteSync::Failed(e)
            }
        };

        Ok(ProfileSubmission {
            user_id,
            state: self.store.load().state(),
            remote,
        })
    }
}

fn normalize(mut profile: Profile) -> Profile {
    profile.country_of_origin = profile.country_of_origin.trim().to_owned();
    profile.country_of_occupation = profile.country_of_occupation.trim().to_owned();
    profile.occupation = profile.occupation.trim().to_owned();
    profile.languages = profile
        .languages
        .into_iter()
        .map(|l| l.trim().to_owned())
        .filter(|l| !l.is_empty())
        .collect();
    profile
}
