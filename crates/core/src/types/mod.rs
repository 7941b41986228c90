//! Core types for Avatar Studio.
//!
//! This module provides type-safe wrappers for the domain concepts shared by
//! the session store, the backend client and the flows.

pub mod artifact;
pub mod credential;
pub mod id;
pub mod profile;
pub mod quota;
pub mod session;

pub use artifact::{EncodedImage, GeneratedArtifact};
pub use credential::PasswordDigest;
pub use id::{UserId, UserIdError};
pub use profile::{AgeRange, Ethnicity, Gender, ParseEnumError, Profile};
pub use quota::{GENERATION_LIMIT, QuotaCounter};
pub use session::{Coordinates, SessionState};
