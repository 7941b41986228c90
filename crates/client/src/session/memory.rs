//! In-memory session store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use avatar_studio_core::Profile;
use tokio::sync::broadcast;

use super::record::{self, KeySpace};
use super::{
    DetectedLocation, HandleId, Identity, SessionChange, SessionError, SessionEvent,
    SessionSnapshot, SessionStore, SessionWatcher, event_channel, publish,
};

/// Process-local session store.
///
/// Each value is one handle. [`open_tab`](Self::open_tab) returns another
/// handle on the same storage, which is how several screens or simulated
/// browser tabs share a session.
#[derive(Debug)]
pub struct MemorySessionStore {
    id: HandleId,
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    keys: Mutex<KeySpace>,
    events: broadcast::Sender<SessionEvent>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: HandleId::next(),
            shared: Arc::new(Shared {
                keys: Mutex::new(KeySpace::new()),
                events: event_channel(),
            }),
        }
    }

    /// Another handle on the same storage.
    #[must_use]
    pub fn open_tab(&self) -> Self {
        Self {
            id: HandleId::next(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Raw value of one key, as it would be persisted.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, KeySpace> {
        self.shared.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate(&self, change: SessionChange, apply: impl FnOnce(&mut KeySpace)) {
        apply(&mut self.lock());
        publish(&self.shared.events, self.id, change);
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, identity: &Identity, profile: &Profile) -> Result<(), SessionError> {
        // The whole update happens under one lock, so readers never see half of it
        self.mutate(SessionChange::Saved, |keys| {
            record::write_session(keys, identity, profile);
        });
        Ok(())
    }

    fn load(&self) -> SessionSnapshot {
        record::read_snapshot(&self.lock())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.mutate(SessionChange::Cleared, KeySpace::clear);
        Ok(())
    }

    fn set_session_flag(&self, logged_in: bool) -> Result<(), SessionError> {
        self.mutate(SessionChange::SessionFlag(logged_in), |keys| {
            record::write_session_flag(keys, logged_in);
        });
        Ok(())
    }

    fn update_location(&self, location: &DetectedLocation) -> Result<(), SessionError> {
        self.mutate(SessionChange::LocationUpdated, |keys| {
            record::write_location(keys, location);
        });
        Ok(())
    }

    fn subscribe(&self) -> SessionWatcher {
        SessionWatcher::new(self.id, self.shared.events.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use avatar_studio_core::{SessionState, UserId};

    use super::*;

    fn identity(name: &str) -> Identity {
        Identity {
            user_id: UserId::parse(name).unwrap(),
            password: None,
        }
    }

    #[test]
    fn test_load_empty_defaults() {
        let store = MemorySessionStore::new();
        let snapshot = store.load();
        assert_eq!(snapshot, SessionSnapshot::default());
        assert_eq!(snapshot.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let store = MemorySessionStore::new();
        let profile = Profile {
            country_of_origin: "Ghana".to_string(),
            country_of_occupation: "Ghana".to_string(),
            occupation: "Teacher".to_string(),
            // Stored as given; only the submission flow normalizes
            languages: [String::new(), " Twi".to_string()].into_iter().collect(),
            ..Profile::default()
        };
        store.save(&identity("kofi"), &profile).unwrap();

        let snapshot = store.load();
        assert_eq!(snapshot.identity, Some(identity("kofi")));
        assert_eq!(snapshot.profile, profile);
    }

    #[test]
    fn test_stale_identity_without_flag_is_anonymous() {
        let store = MemorySessionStore::new();
        store.save(&identity("kofi"), &Profile::default()).unwrap();
        assert_eq!(store.load().state(), SessionState::Anonymous);

        store.set_session_flag(true).unwrap();
        assert_eq!(store.load().state(), SessionState::Authenticated);

        store.set_session_flag(false).unwrap();
        assert_eq!(store.load().state(), SessionState::Anonymous);
        assert!(store.load().identity.is_some());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = MemorySessionStore::new();
        store.save(&identity("kofi"), &Profile::default()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), SessionSnapshot::default());
    }

    #[test]
    fn test_tabs_share_storage_and_see_each_others_changes() {
        let first = MemorySessionStore::new();
        let second = first.open_tab();
        let mut first_watch = first.subscribe();
        let mut second_watch = second.subscribe();

        first.save(&identity("kofi"), &Profile::default()).unwrap();
        first.set_session_flag(true).unwrap();
        assert_eq!(second.load().state(), SessionState::Authenticated);

        // Own changes are not reported back to the same handle
        assert_eq!(first_watch.try_changed(), None);
        assert_eq!(second_watch.try_changed(), Some(SessionChange::Saved));
        assert_eq!(
            second_watch.try_changed(),
            Some(SessionChange::SessionFlag(true))
        );

        second.clear().unwrap();
        assert_eq!(first_watch.try_changed(), Some(SessionChange::Cleared));
        assert_eq!(first.load().state(), SessionState::Anonymous);
    }

    #[test]
    fn test_raw_exposes_persisted_values() {
        let store = MemorySessionStore::new();
        store.set_session_flag(true).unwrap();
        assert_eq!(store.raw("isLoggedIn").as_deref(), Some("true"));
        assert_eq!(store.raw("user_id"), None);
    }
}
