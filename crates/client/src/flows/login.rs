//! Login, logout and password reset against the locally stored identity.

use avatar_studio_core::SessionState;
use secrecy::{ExposeSecret, SecretString};

use super::enroll_optional;
use crate::auth::CredentialVerifier;
use crate::error::{FlowError, Result};
use crate::session::{Identity, SessionStore};

/// Session transitions that do not involve the backend.
pub struct LoginFlow<'a, S, V> {
    store: &'a S,
    verifier: &'a V,
}

impl<'a, S, V> LoginFlow<'a, S, V>
where
    S: SessionStore,
    V: CredentialVerifier,
{
    #[must_use]
    pub const fn new(store: &'a S, verifier: &'a V) -> Self {
        Self { store, verifier }
    }

    /// Anonymous to Authenticated if the credentials match the stored identity.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidCredentials` if they do not; the session is
    /// left unchanged.
    pub fn login(&self, user_id: &str, password: &SecretString) -> Result<SessionState> {
        let identity = self.matching_identity(user_id)?;
        if !self.password_matches(&identity, password) {
            tracing::info!(user_id = %identity.user_id, "Login rejected");
            return Err(FlowError::InvalidCredentials);
        }

        self.store.set_session_flag(true)?;
        tracing::info!(user_id = %identity.user_id, "Logged in");
        Ok(self.store.load().state())
    }

    /// Authenticated to Anonymous. Removes every stored key.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Session` if storage cannot be cleared.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Replace the stored password if `user_id` matches the stored identity.
    ///
    /// Does not change whether the session is logged in.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidCredentials` if no matching identity is
    /// stored.
    pub fn reset_password(&self, user_id: &str, new_password: &SecretString) -> Result<()> {
        let identity = self.matching_identity(user_id)?;
        let profile = self.store.load().profile;
        let updated = Identity {
            password: enroll_optional(self.verifier, new_password)?,
            ..identity
        };

        self.store.save(&updated, &profile)?;
        tracing::info!(user_id = %updated.user_id, "Password reset");
        Ok(())
    }

    fn matching_identity(&self, user_id: &str) -> Result<Identity> {
        self.store
            .load()
            .identity
            .filter(|stored| stored.user_id.as_str() == user_id.trim())
            .ok_or(FlowError::InvalidCredentials)
    }

    fn password_matches(&self, identity: &Identity, password: &SecretString) -> bool {
        let Some(digest) = &identity.password else {
            // Registered without a password
            return password.expose_secret().is_empty();
        };

        self.verifier
            .verify(password, digest)
            .inspect_err(|e| {
                tracing::warn!(user_id = %identity.user_id, error = %e, "Stored digest unusable");
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use avatar_studio_core::{PasswordDigest, Profile, UserId};

    use super::*;
    use crate::auth::Argon2Verifier;
    use crate::session::{MemorySessionStore, SessionChange};

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    fn registered(password: &str) -> MemorySessionStore {
        let store = MemorySessionStore::new();
        let identity = Identity {
            user_id: UserId::parse("alice").unwrap(),
            password: Some(Argon2Verifier.enroll(&secret(password)).unwrap()),
        };
        let profile = Profile {
            occupation: "Pilot".to_string(),
            ..Profile::default()
        };
        store.save(&identity, &profile).unwrap();
        store
    }

    #[test]
    fn test_login_with_matching_credentials() {
        let store = registered("pw");
        let flow = LoginFlow::new(&store, &Argon2Verifier);

        assert_eq!(
            flow.login(" alice", &secret("pw")).unwrap(),
            SessionState::Authenticated
        );
    }

    #[test]
    fn test_login_rejects_wrong_password_or_user() {
        let store = registered("pw");
        let flow = LoginFlow::new(&store, &Argon2Verifier);

        assert!(matches!(
            flow.login("alice", &secret("nope")),
            Err(FlowError::InvalidCredentials)
        ));
        assert!(matches!(
            flow.login("bob", &secret("pw")),
            Err(FlowError::InvalidCredentials)
        ));
        assert_eq!(store.load().state(), SessionState::Anonymous);
    }

    #[test]
    fn test_login_without_registration() {
        let store = MemorySessionStore::new();
        let flow = LoginFlow::new(&store, &Argon2Verifier);
        let err = flow.login("alice", &secret("")).unwrap_err();
        assert_eq!(err.user_message(), "Invalid name or password. Please register.");
    }

    #[test]
    fn test_corrupt_digest_rejects_login() {
        let store = MemorySessionStore::new();
        let identity = Identity {
            user_id: UserId::parse("alice").unwrap(),
            password: Some(PasswordDigest::new("pw".to_string())),
        };
        store.save(&identity, &Profile::default()).unwrap();

        let flow = LoginFlow::new(&store, &Argon2Verifier);
        assert!(flow.login("alice", &secret("pw")).is_err());
    }

    #[test]
    fn test_logout_is_observed_by_other_tab() {
        let store = registered("pw");
        let other_tab = store.open_tab();
        let mut watcher = other_tab.subscribe();
        let flow = LoginFlow::new(&store, &Argon2Verifier);
        flow.login("alice", &secret("pw")).unwrap();

        flow.logout().unwrap();

        let mut last = None;
        while let Some(change) = watcher.try_changed() {
            last = Some(change);
        }
        assert_eq!(last, Some(SessionChange::Cleared));
        assert_eq!(other_tab.load().state(), SessionState::Anonymous);
        assert!(other_tab.load().identity.is_none());
    }

    #[test]
    fn test_reset_password_keeps_profile_and_flag() {
        let store = registered("old");
        let flow = LoginFlow::new(&store, &Argon2Verifier);
        flow.login("alice", &secret("old")).unwrap();

        flow.reset_password("alice", &secret("new")).unwrap();

        assert_eq!(store.load().state(), SessionState::Authenticated);
        assert_eq!(store.load().profile.occupation, "Pilot");
        store.set_session_flag(false).unwrap();
        assert!(flow.login("alice", &secret("old")).is_err());
        assert!(flow.login("alice", &secret("new")).is_ok());
    }

    #[test]
    fn test_reset_password_unknown_user() {
        let store = registered("old");
        let flow = LoginFlow::new(&store, &Argon2Verifier);
        assert!(matches!(
            flow.reset_password("mallory", &secret("x")),
            Err(FlowError::InvalidCredentials)
        ));
    }
}
