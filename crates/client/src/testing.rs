//! In-process backend used by unit tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use avatar_studio_core::{Coordinates, EncodedImage, GeneratedArtifact, UserId};
use tokio::sync::Notify;

use crate::api::{
    ApiError, AvatarBackend, AvatarRequest, GeneratedImage, QuotaStatus, UserDetails,
    describe_error_body,
};
use crate::geo::ReverseGeocoder;

/// A 1x1 transparent PNG.
pub(crate) const PNG_PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// A backend call as the fake received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    AvatarCount(String),
    Generate(AvatarRequest),
    ListAvatars(String),
    StoreDetails(UserDetails),
}

/// A canned non-success response.
#[derive(Debug, Clone)]
pub(crate) struct Failure {
    status: u16,
    body: String,
}

impl Failure {
    pub(crate) fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }

    fn to_error(&self) -> ApiError {
        ApiError::Status {
            status: self.status,
            message: describe_error_body(self.status, &self.body),
        }
    }
}

#[derive(Debug)]
struct FakeState {
    calls: Vec<Call>,
    /// `None` makes `avatar-count` fail.
    remaining: Option<u32>,
    image: String,
    generate_failure: Option<Failure>,
    avatars: Vec<GeneratedArtifact>,
    list_failure: Option<Failure>,
    details_failure: Option<Failure>,
}

/// Records every call and answers from canned state.
///
/// Generation decrements `remaining` like the real backend and answers 403
/// once it reaches zero.
#[derive(Debug)]
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
    gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                remaining: Some(10),
                image: PNG_PIXEL.to_owned(),
                generate_failure: None,
                avatars: Vec::new(),
                list_failure: None,
                details_failure: None,
            }),
            gate: None,
        }
    }

    pub(crate) fn with_remaining(self, remaining: Option<u32>) -> Self {
        self.lock().remaining = remaining;
        self
    }

    pub(crate) fn with_image(self, image: &str) -> Self {
        image.clone_into(&mut self.lock().image);
        self
    }

    pub(crate) fn with_avatars(self, avatars: Vec<GeneratedArtifact>) -> Self {
        self.lock().avatars = avatars;
        self
    }

    pub(crate) fn failing_generation(self, failure: Failure) -> Self {
        self.lock().generate_failure = Some(failure);
        self
    }

    pub(crate) fn failing_list(self, failure: Failure) -> Self {
        self.lock().list_failure = Some(failure);
        self
    }

    pub(crate) fn failing_details(self, failure: Failure) -> Self {
        self.lock().details_failure = Some(failure);
        self
    }

    /// Hold every generation until the returned handle is notified.
    pub(crate) fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub(crate) fn generate_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Generate(_)))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }
}

impl AvatarBackend for FakeBackend {
    async fn avatar_count(&self, user_id: &UserId) -> Result<QuotaStatus, ApiError> {
        self.record(Call::AvatarCount(user_id.to_string()));
        self.lock()
            .remaining
            .map(|remaining| QuotaStatus {
                remaining,
                count: Some(10 - remaining.min(10)),
            })
            .ok_or_else(|| Failure::new(500, "Internal Server Error").to_error())
    }

    async fn generate_avatar(&self, request: &AvatarRequest) -> Result<GeneratedImage, ApiError> {
        self.record(Call::Generate(request.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let mut state = self.lock();
        if let Some(failure) = &state.generate_failure {
            return Err(failure.to_error());
        }
        if state.remaining == Some(0) {
            return Err(Failure::new(
                403,
                r#"{"detail": "Avatar generation limit (10) reached for this user."}"#,
            )
            .to_error());
        }
        state.remaining = state.remaining.map(|n| n - 1);
        Ok(GeneratedImage {
            image: EncodedImage::new(state.image.clone()),
        })
    }

    async fn list_avatars(&self, user_id: &UserId) -> Result<Vec<GeneratedArtifact>, ApiError> {
        self.record(Call::ListAvatars(user_id.to_string()));
        let state = self.lock();
        match &state.list_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(state.avatars.clone()),
        }
    }

    async fn store_user_details(
        &self,
        details: &UserDetails,
    ) -> Result<serde_json::Value, ApiError> {
        self.record(Call::StoreDetails(details.clone()));
        match &self.lock().details_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(serde_json::json!({"message": "User details stored successfully"})),
        }
    }
}

/// Geocoder answering from a fixed result.
#[derive(Debug)]
pub(crate) enum FakeGeocoder {
    Country(&'static str),
    Nothing,
    Down,
}

impl ReverseGeocoder for FakeGeocoder {
    async fn country_at(&self, _coordinates: Coordinates) -> Result<Option<String>, ApiError> {
        match self {
            Self::Country(name) => Ok(Some((*name).to_owned())),
            Self::Nothing => Ok(None),
            Self::Down => Err(ApiError::Timeout),
        }
    }
}
