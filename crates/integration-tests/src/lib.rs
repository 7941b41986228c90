//! Integration tests for Avatar Studio.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p avatar-studio-integration-tests
//! ```
//!
//! The tests need no external services: [`StubBackend`] serves the backend
//! REST surface from an in-process axum router on an ephemeral port, and the
//! real `reqwest` client talks to it.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A 1x1 transparent PNG.
pub const PNG_PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Per-user generation limit the stub enforces.
pub const STUB_LIMIT: u32 = 10;

/// Behaviour switches and recorded traffic.
#[derive(Debug, Default)]
pub struct StubState {
    /// Generations used, per user id.
    pub used: HashMap<String, u32>,
    /// Stored avatars, per user id.
    pub avatars: HashMap<String, Vec<Value>>,
    /// Bodies received on `/store-user-details`.
    pub details: Vec<Value>,
    /// Bodies received on `/store-user-avatar`.
    pub generation_requests: Vec<Value>,
    /// Number of requests per path.
    pub hits: BTreeMap<&'static str, usize>,
    /// Answer `/store-user-details` with 500.
    pub fail_details: bool,
    /// Answer `/avatars` with a bare list instead of `{avatars: [...]}`.
    pub bare_avatar_list: bool,
    /// Name the image field `image_base64` instead of `image`.
    pub legacy_image_field: bool,
    /// Hold `/store-user-avatar` responses for this long before answering.
    pub generation_delay: Option<Duration>,
}

type Shared = Arc<Mutex<StubState>>;

/// The backend REST surface, served on `127.0.0.1:<ephemeral>`.
///
/// The server task stops when the value is dropped.
pub struct StubBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl StubBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound.
    pub async fn spawn() -> std::io::Result<Self> {
        let state = Shared::default();
        let app = Router::new()
            .route("/avatar-count", get(avatar_count))
            .route("/store-user-avatar", post(store_user_avatar))
            .route("/avatars", get(avatars))
            .route("/store-user-details", post(store_user_details))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Inspect or change the stub's state.
    pub fn state(&self) -> MutexGuard<'_, StubState> {
        lock(&self.state)
    }

    /// Requests received on `path`.
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        self.state().hits.get(path).copied().unwrap_or(0)
    }

    /// Seed `count` previous generations for `user_id`.
    pub fn seed_avatars(&self, user_id: &str, count: u32) {
        let mut state = self.state();
        for n in 0..count {
            let record = artifact(user_id, "Chile", &format!("seeded {n}"));
            state.avatars.entry(user_id.to_owned()).or_default().push(record);
        }
        *state.used.entry(user_id.to_owned()).or_default() += count;
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, StubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn hit(state: &mut StubState, path: &'static str) {
    *state.hits.entry(path).or_default() += 1;
}

fn detail(status: StatusCode, detail: Value) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn missing_field(location: &str, field: &str) -> Response {
    detail(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!([{ "loc": [location, field], "msg": "field required", "type": "missing" }]),
    )
}

fn artifact(user_id: &str, country: &str, prompt: &str) -> Value {
    json!({
        "user_id": user_id,
        "country": country,
        "prompt": prompt,
        "image_base64": PNG_PIXEL,
        "timestamp": chrono::Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    })
}

async fn avatar_count(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = lock(&state);
    hit(&mut state, "/avatar-count");

    let Some(user_id) = query.get("userId") else {
        return missing_field("query", "userId");
    };
    let used = state.used.get(user_id).copied().unwrap_or(0);
    Json(json!({ "count": used, "remaining": STUB_LIMIT.saturating_sub(used) })).into_response()
}

async fn store_user_avatar(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let delay = lock(&shared).generation_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = lock(&shared);
    hit(&mut state, "/store-user-avatar");
    state.generation_requests.push(body.clone());

    let text = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or_default();
    let user_id = text("user_id").to_owned();
    if user_id.is_empty() {
        return missing_field("body", "user_id");
    }
    if text("prompt").trim().is_empty() {
        return missing_field("body", "prompt");
    }

    let used = state.used.get(&user_id).copied().unwrap_or(0);
    if used >= STUB_LIMIT {
        return detail(
            StatusCode::FORBIDDEN,
            json!(format!(
                "Avatar generation limit ({STUB_LIMIT}) reached for this user."
            )),
        );
    }

    let record = artifact(&user_id, text("country"), text("prompt"));
    state.avatars.entry(user_id.clone()).or_default().push(record);
    state.used.insert(user_id, used + 1);

    let field = if state.legacy_image_field { "image_base64" } else { "image" };
    let mut response = json!({ "message": "Avatar stored successfully" });
    response[field] = json!(PNG_PIXEL);
    Json(response).into_response()
}

async fn avatars(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = lock(&state);
    hit(&mut state, "/avatars");

    let Some(user_id) = query.get("userId") else {
        return missing_field("query", "userId");
    };
    let list = state.avatars.get(user_id).cloned().unwrap_or_default();
    if state.bare_avatar_list {
        Json(Value::Array(list)).into_response()
    } else {
        Json(json!({ "avatars": list })).into_response()
    }
}

async fn store_user_details(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&state);
    hit(&mut state, "/store-user-details");

    if state.fail_details {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }
    state.details.push(body);
    Json(json!({ "message": "User details stored successfully" })).into_response()
}
