//! Avatar Studio client library.
//!
//! Everything a front end needs to drive the avatar backend:
//!
//! - [`session`] - Persisted identity/profile key space with change notification
//! - [`api`] - `reqwest` client for the backend REST surface
//! - [`auth`] - Credential enrollment and verification
//! - [`geo`] - Best-effort reverse geocoding
//! - [`flows`] - Profile submission, login, avatar generation and gallery fetch
//!
//! Flows never reach into ambient state: the session store and the backend
//! are always passed in explicitly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod geo;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use error::{FlowError, ValidationError};
