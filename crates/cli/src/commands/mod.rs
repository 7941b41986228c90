//! Command implementations.
//!
//! Every command runs against a [`Context`]: the loaded configuration, the
//! file-backed session store and the HTTP backend client.

pub mod account;
pub mod avatar;
pub mod location;
pub mod watch;

use avatar_studio_client::{ClientConfig, FlowError};
use avatar_studio_client::api::{ApiError, HttpAvatarApi};
use avatar_studio_client::auth::Argon2Verifier;
use avatar_studio_client::session::{FileSessionStore, SessionStore};
use avatar_studio_core::UserId;
use secrecy::SecretString;
use thiserror::Error;
use tokio::io::AsyncBufReadExt;

use crate::output;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A flow rejected the input or failed.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// The backend client could not be built.
    #[error("Backend client error: {0}")]
    Client(#[from] ApiError),

    /// A protected command was run without a logged-in session.
    #[error("Please log in or complete your profile first.")]
    NotAuthenticated,

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// Message printed to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Flow(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    /// Whether the failure is worth reporting as an error event.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Flow(e) => e.is_internal(),
            Self::Client(_) | Self::Io(_) => true,
            Self::NotAuthenticated => false,
        }
    }
}

/// Shared state for one command invocation.
pub struct Context {
    pub config: ClientConfig,
    pub store: FileSessionStore,
    pub api: HttpAvatarApi,
    pub verifier: Argon2Verifier,
}

impl Context {
    /// # Errors
    ///
    /// Returns `CommandError::Client` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, CommandError> {
        let api = HttpAvatarApi::new(&config.api_base_url, config.request_timeout)?;
        let store = FileSessionStore::open(&config.session_file);
        tracing::debug!(session_file = %config.session_file.display(), "Opened session store");

        Ok(Self {
            config,
            store,
            api,
            verifier: Argon2Verifier,
        })
    }

    /// The logged-in user, for commands behind the login screen.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::NotAuthenticated` unless the session is
    /// authenticated.
    pub fn require_authenticated(&self) -> Result<UserId, CommandError> {
        let snapshot = self.store.load();
        if !snapshot.state().is_authenticated() {
            return Err(CommandError::NotAuthenticated);
        }
        snapshot
            .identity
            .map(|i| i.user_id)
            .ok_or(CommandError::NotAuthenticated)
    }
}

/// Use the password given on the command line, or read one line from stdin.
///
/// # Errors
///
/// Returns `CommandError::Io` if stdin cannot be read.
pub async fn read_password(arg: Option<String>) -> Result<SecretString, CommandError> {
    if let Some(password) = arg {
        return Ok(SecretString::from(password));
    }

    output::prompt("Password: ");
    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    Ok(SecretString::from(password))
}

/// Associate error reports with the logged-in user.
pub fn set_sentry_user(user_id: &UserId) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Stop associating error reports with a user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
