//! File-backed session store.
//!
//! The key space is one JSON object. Each write goes to a fresh temp file in
//! the same directory which is then renamed over the target, so readers in
//! any process see either the old or the new key space, never a partial one.
//!
//! Changes made by other processes are picked up by a debounced filesystem
//! watcher on the file's directory; see [`FileSessionStore::watch_file`].

use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use avatar_studio_core::Profile;
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use tempfile::NamedTempFile;
use tokio::sync::broadcast;

use super::record::{self, KeySpace};
use super::{
    DetectedLocation, EXTERNAL, HandleId, Identity, SessionChange, SessionError, SessionEvent,
    SessionSnapshot, SessionStore, SessionWatcher, event_channel, publish,
};

/// Session store persisted to a JSON file.
///
/// Handles in one process share a write lock and a change channel. Changes
/// made by other processes are picked up by [`watch_file`](Self::watch_file).
#[derive(Debug)]
pub struct FileSessionStore {
    id: HandleId,
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    /// File content as last written or observed by this process.
    /// `None` when the file did not exist.
    seen: Mutex<Option<Vec<u8>>>,
    events: broadcast::Sender<SessionEvent>,
}

/// Keeps the filesystem watcher of [`FileSessionStore::watch_file`] running.
/// Watching stops when this is dropped.
pub struct FileWatchGuard {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl std::fmt::Debug for FileWatchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatchGuard").finish_non_exhaustive()
    }
}

impl FileSessionStore {
    /// Open a store at `path`. The file is created on first write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let seen = read_bytes(&path);
        Self {
            id: HandleId::next(),
            shared: Arc::new(Shared {
                path,
                seen: Mutex::new(seen),
                events: event_channel(),
            }),
        }
    }

    /// Another handle on the same file, sharing this process's lock.
    #[must_use]
    pub fn open_tab(&self) -> Self {
        Self {
            id: HandleId::next(),
            shared: Arc::clone(&self.shared),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Watch the session file and broadcast changes made outside this
    /// process. Bursts of filesystem events within `debounce` are collapsed.
    ///
    /// The parent directory is watched (and created if missing) because
    /// every write replaces the file.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the directory cannot be created or the
    /// platform watcher cannot be started.
    pub fn watch_file(&self, debounce: Duration) -> Result<FileWatchGuard, SessionError> {
        let dir = parent_dir(&self.shared.path).to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let file_name = self.shared.path.file_name().map(OsString::from).ok_or_else(|| {
            std::io::Error::new(ErrorKind::InvalidInput, "session path has no file name")
        })?;

        let shared = Arc::clone(&self.shared);
        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let touched = events.iter().any(|event| {
                        !matches!(event.kind, EventKind::Access(_))
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name() == Some(file_name.as_os_str()))
                    });
                    if touched {
                        shared.reconcile();
                    }
                }
                Err(errors) => {
                    for e in errors {
                        tracing::warn!(error = %e, "Session file watcher error");
                    }
                }
            }
        })?;
        debouncer.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %self.shared.path.display(), "Watching session file");

        Ok(FileWatchGuard {
            _debouncer: debouncer,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Vec<u8>>> {
        self.shared.lock()
    }

    /// Read-modify-write the key space under this process's lock.
    fn mutate(
        &self,
        change: SessionChange,
        apply: impl FnOnce(&mut KeySpace),
    ) -> Result<(), SessionError> {
        {
            let mut seen = self.lock();
            let mut keys = read_keys(&self.shared.path);
            apply(&mut keys);
            let bytes = serde_json::to_vec_pretty(&keys)?;
            write_atomic(&self.shared.path, &bytes)?;
            *seen = Some(bytes);
        }
        publish(&self.shared.events, self.id, change);
        Ok(())
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Option<Vec<u8>>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compare the file against what this process last wrote or saw, and
    /// broadcast a change if they differ.
    fn reconcile(&self) {
        let current = {
            let mut seen = self.lock();
            let current = read_bytes(&self.path);
            if *seen == current {
                return;
            }
            seen.clone_from(&current);
            current
        };

        let change = if current.is_none() {
            SessionChange::Cleared
        } else {
            SessionChange::Replaced
        };
        tracing::info!(path = %self.path.display(), ?change, "Session changed externally");
        publish(&self.events, EXTERNAL, change);
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, identity: &Identity, profile: &Profile) -> Result<(), SessionError> {
        self.mutate(SessionChange::Saved, |keys| {
            record::write_session(keys, identity, profile);
        })
    }

    fn load(&self) -> SessionSnapshot {
        record::read_snapshot(&read_keys(&self.shared.path))
    }

    fn clear(&self) -> Result<(), SessionError> {
        {
            let mut seen = self.lock();
            match std::fs::remove_file(&self.shared.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            *seen = None;
        }
        publish(&self.shared.events, self.id, SessionChange::Cleared);
        Ok(())
    }

    fn set_session_flag(&self, logged_in: bool) -> Result<(), SessionError> {
        self.mutate(SessionChange::SessionFlag(logged_in), |keys| {
            record::write_session_flag(keys, logged_in);
        })
    }

    fn update_location(&self, location: &DetectedLocation) -> Result<(), SessionError> {
        self.mutate(SessionChange::LocationUpdated, |keys| {
            record::write_location(keys, location);
        })
    }

    fn subscribe(&self) -> SessionWatcher {
        SessionWatcher::new(self.id, self.shared.events.subscribe())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Read the key space; a missing or corrupt file reads as empty.
fn read_keys(path: &Path) -> KeySpace {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return KeySpace::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read session file");
            return KeySpace::new();
        }
    };

    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt session file");
        KeySpace::new()
    })
}

fn read_bytes(path: &Path) -> Option<Vec<u8>> {
    std::fs::read(path).ok()
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Write through a uniquely named temp file in the target's directory, then
/// rename it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
