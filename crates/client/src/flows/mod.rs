//! User flows.
//!
//! Each flow receives the session store and the backend it works against. The
//! session lifecycle they drive is:
//!
//! ```text
//!              submit profile / login
//!   Anonymous ------------------------> Authenticated
//!       ^                                     |
//!       +------------- logout ----------------+
//! ```
//!
//! There is no expiry and no server-side session: the state is the stored
//! identity plus the logged-in marker.

pub mod avatar;
pub mod gallery;
pub mod location;
pub mod login;
pub mod profile;

pub use avatar::{AvatarRequestFlow, GeneratedAvatar, GenerationOutcome};
pub use gallery::{EMPTY_NOTICE, Gallery, GalleryFetchFlow};
pub use location::LocationFlow;
pub use login::LoginFlow;
pub use profile::{ProfileForm, ProfileSubmission, ProfileSubmissionFlow, RemoteSync};

use secrecy::{ExposeSecret, SecretString};

use crate::auth::CredentialVerifier;
use crate::error::Result;
use avatar_studio_core::PasswordDigest;

/// Enroll a password, or store none when it was left blank.
fn enroll_optional<V: CredentialVerifier>(
    verifier: &V,
    password: &SecretString,
) -> Result<Option<PasswordDigest>> {
    if password.expose_secret().is_empty() {
        return Ok(None);
    }
    Ok(Some(verifier.enroll(password)?))
}
