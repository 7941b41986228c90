//! Session store.
//!
//! Holds the persisted identity and profile of the current user, the
//! logged-in marker, and the last detected location.
//!
//! # Implementations
//!
//! - [`MemorySessionStore`] - process-local; handles opened with
//!   [`MemorySessionStore::open_tab`] share storage like browser tabs do
//! - [`FileSessionStore`] - JSON key space on disk, shared between processes
//!
//! # Change notification
//!
//! Every store broadcasts its mutations. A [`SessionWatcher`] only yields
//! changes made through *other* handles, so one handle's logout is observed
//! by the others. Delivery is best-effort and eventually consistent: writes
//! are last-writer-wins and nothing is locked across handles.

mod file;
pub mod keys;
mod memory;
mod record;

pub use file::{FileSessionStore, FileWatchGuard};
pub use memory::MemorySessionStore;
pub use record::KeySpace;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use avatar_studio_core::{Coordinates, PasswordDigest, Profile, SessionState, UserId};
use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of each store's change channel.
const EVENT_CAPACITY: usize = 64;

/// Errors that can occur when persisting session data.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the backing file failed.
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key space could not be serialized.
    #[error("session serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The session file watcher could not be started.
    #[error("session file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    /// Digest produced by the credential verifier, if a password was set.
    pub password: Option<PasswordDigest>,
}

/// Best-effort location data, independent of the profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedLocation {
    /// Country reported by reverse geocoding.
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// Everything the store currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub profile: Profile,
    pub location: DetectedLocation,
    /// The explicit logged-in marker.
    pub logged_in: bool,
}

impl SessionSnapshot {
    /// Authenticated iff an identity is present and the marker is set.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        SessionState::derive(self.identity.is_some(), self.logged_in)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.identity.as_ref().map(|i| &i.user_id)
    }
}

/// Persisted session state shared by every flow.
///
/// Flows receive the store as an explicit dependency; nothing reaches into
/// ambient storage.
pub trait SessionStore: Send + Sync {
    /// Persist identity and profile together. A subsequent [`load`](Self::load)
    /// sees either all of the new values or, if this fails, none of them.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the backing storage cannot be written.
    fn save(&self, identity: &Identity, profile: &Profile) -> Result<(), SessionError>;

    /// Current state. Never fails; missing or unreadable data yields defaults.
    fn load(&self) -> SessionSnapshot;

    /// Remove every persisted key. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the backing storage cannot be written.
    fn clear(&self) -> Result<(), SessionError>;

    /// Set or remove the logged-in marker, leaving identity untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the backing storage cannot be written.
    fn set_session_flag(&self, logged_in: bool) -> Result<(), SessionError>;

    /// Replace the stored location data.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the backing storage cannot be written.
    fn update_location(&self, location: &DetectedLocation) -> Result<(), SessionError>;

    /// Watch for changes made through other handles.
    fn subscribe(&self) -> SessionWatcher;
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn save(&self, identity: &Identity, profile: &Profile) -> Result<(), SessionError> {
        (**self).save(identity, profile)
    }

    fn load(&self) -> SessionSnapshot {
        (**self).load()
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }

    fn set_session_flag(&self, logged_in: bool) -> Result<(), SessionError> {
        (**self).set_session_flag(logged_in)
    }

    fn update_location(&self, location: &DetectedLocation) -> Result<(), SessionError> {
        (**self).update_location(location)
    }

    fn subscribe(&self) -> SessionWatcher {
        (**self).subscribe()
    }
}

impl<T: SessionStore + ?Sized> SessionStore for &T {
    fn save(&self, identity: &Identity, profile: &Profile) -> Result<(), SessionError> {
        (**self).save(identity, profile)
    }

    fn load(&self) -> SessionSnapshot {
        (**self).load()
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }

    fn set_session_flag(&self, logged_in: bool) -> Result<(), SessionError> {
        (**self).set_session_flag(logged_in)
    }

    fn update_location(&self, location: &DetectedLocation) -> Result<(), SessionError> {
        (**self).update_location(location)
    }

    fn subscribe(&self) -> SessionWatcher {
        (**self).subscribe()
    }
}

// =============================================================================
// Change Notification
// =============================================================================

/// Identifies one handle on a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

/// Origin used for changes detected in storage but made outside this process.
pub(crate) const EXTERNAL: HandleId = HandleId(0);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl HandleId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

/// What changed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// Identity and profile were saved.
    Saved,
    /// The logged-in marker was set or removed.
    SessionFlag(bool),
    LocationUpdated,
    /// Every key was removed (logout).
    Cleared,
    /// Storage changed in a way this process did not observe directly.
    Replaced,
}

/// A change together with the handle that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    pub origin: HandleId,
    pub change: SessionChange,
}

/// Receives changes made through handles other than the one it was
/// subscribed from.
#[derive(Debug)]
pub struct SessionWatcher {
    own: HandleId,
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionWatcher {
    pub(crate) const fn new(own: HandleId, receiver: broadcast::Receiver<SessionEvent>) -> Self {
        Self { own, receiver }
    }

    /// Wait for the next foreign change. Returns `None` once the store is gone.
    ///
    /// If the watcher fell behind, the missed changes collapse into a single
    /// [`SessionChange::Replaced`]; callers should reload in either case.
    pub async fn changed(&mut self) -> Option<SessionChange> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin == self.own => {}
                Ok(event) => return Some(event.change),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Session watcher lagged behind");
                    return Some(SessionChange::Replaced);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`changed`](Self::changed).
    pub fn try_changed(&mut self) -> Option<SessionChange> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.origin == self.own => {}
                Ok(event) => return Some(event.change),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    return Some(SessionChange::Replaced);
                }
                Err(_) => return None,
            }
        }
    }
}

pub(crate) fn event_channel() -> broadcast::Sender<SessionEvent> {
    broadcast::channel(EVENT_CAPACITY).0
}

/// Broadcast a change; having no subscribers is not an error.
pub(crate) fn publish(
    events: &broadcast::Sender<SessionEvent>,
    origin: HandleId,
    change: SessionChange,
) {
    tracing::debug!(?change, "Session changed");
    let _ = events.send(SessionEvent { origin, change });
}
