//! Avatar generation.
//!
//! # Screen lifecycle
//!
//! The flow backs the generation screen. [`enter`](AvatarRequestFlow::enter)
//! starts a new screen epoch and refreshes the quota counter;
//! [`leave`](AvatarRequestFlow::leave) ends it. A request cannot be cancelled
//! once sent, so a result that arrives after its epoch ended is returned as
//! [`GenerationOutcome::Discarded`] and never applied to the counter.
//!
//! # Preconditions
//!
//! [`generate`](AvatarRequestFlow::generate) checks, before any network call
//! and in this order:
//!
//! 1. a user id is stored
//! 2. the prompt is non-empty after trimming
//! 3. the profile has every field the backend requires
//! 4. the quota counter is unknown or positive
//! 5. no other generation is in flight
//!
//! The counter is advisory. The backend enforces the real limit; a 403 from
//! it pins the counter at zero until the next refresh.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use avatar_studio_core::{EncodedImage, QuotaCounter};

use crate::api::{ApiError, AvatarBackend, AvatarRequest};
use crate::error::{FlowError, Result, ValidationError, quota_exceeded};
use crate::session::SessionStore;

/// A successfully generated avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAvatar {
    pub image: EncodedImage,
    /// Decoded image bytes.
    pub bytes: Vec<u8>,
    /// Counter value after this generation, if known.
    pub remaining: Option<u32>,
}

impl GeneratedAvatar {
    /// Image reference suitable for embedding.
    #[must_use]
    pub fn data_uri(&self) -> String {
        self.image.data_uri()
    }
}

/// What happened to a completed generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The result was applied to the screen state.
    Applied(GeneratedAvatar),
    /// The screen was left while the request was pending; nothing was applied.
    Discarded,
}

/// Generation screen state: the quota counter and the pending request.
pub struct AvatarRequestFlow<S, B> {
    store: S,
    backend: B,
    quota: Mutex<QuotaCounter>,
    in_flight: AtomicBool,
    epoch: AtomicU64,
}

impl<S, B> AvatarRequestFlow<S, B>
where
    S: SessionStore,
    B: AvatarBackend,
{
    #[must_use]
    pub fn new(store: S, backend: B) -> Self {
        Self {
            store,
            backend,
            quota: Mutex::new(QuotaCounter::unknown()),
            in_flight: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        }
    }

    /// Enter the screen: start a new epoch and fetch the remaining quota.
    pub async fn enter(&self) -> QuotaCounter {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.refresh_quota().await
    }

    /// Leave the screen. Pending results will be discarded.
    pub fn leave(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Replace the counter with the server's value.
    ///
    /// A failed fetch leaves the counter unknown, which does not block
    /// requests; the backend still enforces the limit.
    pub async fn refresh_quota(&self) -> QuotaCounter {
        let Some(user_id) = self.store.load().identity.map(|i| i.user_id) else {
            return self.set_quota(QuotaCounter::unknown());
        };

        let epoch = self.epoch.load(Ordering::Acquire);
        let counter = match self.backend.avatar_count(&user_id).await {
            Ok(status) => QuotaCounter::from_server(status.remaining),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to fetch remaining avatars");
                QuotaCounter::unknown()
            }
        };

        if self.epoch.load(Ordering::Acquire) != epoch {
            return self.quota();
        }
        self.set_quota(counter)
    }

    /// Current counter value.
    #[must_use]
    pub fn quota(&self) -> QuotaCounter {
        *self.lock_quota()
    }

    /// Whether a generation request is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether the submit control should be enabled for `prompt`.
    #[must_use]
    pub fn can_submit(&self, prompt: &str) -> bool {
        !self.is_pending() && !prompt.trim().is_empty() && self.quota().allows_request()
    }

    /// Request one avatar for `prompt`.
    ///
    /// # Errors
    ///
    /// Fails without a network call with `MissingIdentity`, `Validation`,
    /// `IncompleteProfile`, `QuotaExceeded` or `RequestPending`. Backend
    /// failures surface as `FlowError::Api`.
    pub async fn generate(&self, prompt: &str) -> Result<GenerationOutcome> {
        let snapshot = self.store.load();
        let user_id = snapshot.user_id().cloned().ok_or(FlowError::MissingIdentity)?;

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError::EmptyField("prompt").into());
        }

        let missing = snapshot.profile.missing_for_generation();
        if !missing.is_empty() {
            return Err(FlowError::IncompleteProfile { missing });
        }

        if !self.quota().allows_request() {
            return Err(quota_exceeded());
        }

        let _pending = PendingGuard::acquire(&self.in_flight).ok_or(FlowError::RequestPending)?;
        let epoch = self.epoch.load(Ordering::Acquire);

        let request = AvatarRequest::new(
            &user_id,
            &snapshot.profile,
            snapshot.location.country.as_deref(),
            prompt,
        );
        tracing::info!(%user_id, country = %request.country, "Generating avatar");
        let result = self.backend.generate_avatar(&request).await;

        if self.epoch.load(Ordering::Acquire) != epoch {
            tracing::info!(%user_id, "Screen left before generation finished; result discarded");
            return Ok(GenerationOutcome::Discarded);
        }

        let image = match result {
            Ok(response) => response.image,
            Err(e) => {
                if e.status() == Some(403) {
                    self.set_quota(QuotaCounter::from_server(0));
                }
                return Err(e.into());
            }
        };

        if image.is_empty() {
            return Err(ApiError::MalformedResponse("response contained no image".into()).into());
        }
        let bytes = image
            .decode()
            .map_err(|e| ApiError::MalformedResponse(format!("image is not valid base64: {e}")))?;

        let remaining = {
            let mut quota = self.lock_quota();
            quota.record_generation();
            quota.remaining()
        };
        tracing::info!(%user_id, ?remaining, "Avatar generated");

        Ok(GenerationOutcome::Applied(GeneratedAvatar {
            image,
            bytes,
            remaining,
        }))
    }

    fn lock_quota(&self) -> MutexGuard<'_, QuotaCounter> {
        self.quota.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_quota(&self, counter: QuotaCounter) -> QuotaCounter {
        *self.lock_quota() = counter;
        counter
    }
}

/// Marks a request in flight for as long as it is held.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
