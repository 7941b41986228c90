//! Credential enrollment and verification.
//!
//! Passwords are never stored. Registration enrolls the password into a
//! [`PasswordDigest`] which is what the session store keeps; login verifies
//! the submitted password against that digest.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use avatar_studio_core::PasswordDigest;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Errors that can occur during credential operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password hashing error.
    #[error("password hashing error")]
    Hash,

    /// The stored digest is not a valid PHC string.
    #[error("stored password digest is unreadable")]
    InvalidDigest,
}

/// Turns passwords into digests and checks passwords against them.
pub trait CredentialVerifier: Send + Sync {
    /// Produce a digest for `password`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hash` if hashing fails.
    fn enroll(&self, password: &SecretString) -> Result<PasswordDigest, AuthError>;

    /// Whether `password` matches `digest`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidDigest` if `digest` cannot be parsed.
    fn verify(&self, password: &SecretString, digest: &PasswordDigest) -> Result<bool, AuthError>;
}

/// Argon2id with a random salt per enrollment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn enroll(&self, password: &SecretString) -> Result<PasswordDigest, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| PasswordDigest::new(hash.to_string()))
            .map_err(|_| AuthError::Hash)
    }

    fn verify(&self, password: &SecretString, digest: &PasswordDigest) -> Result<bool, AuthError> {
        let parsed_hash =
            PasswordHash::new(digest.as_str()).map_err(|_| AuthError::InvalidDigest)?;
        let argon2 = Argon2::default();

        Ok(argon2
            .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
            .is_ok())
    }
}
