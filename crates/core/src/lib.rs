//! Avatar Studio Core - Shared domain types.
//!
//! This crate provides the types shared by every Avatar Studio component:
//! - `client` - Session store, backend API client and user flows
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Validated identifiers, profile enumerations, quota and artifacts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
