//! Avatar generation and gallery against the stub backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use avatar_studio_client::FlowError;
use avatar_studio_client::api::{ApiError, HttpAvatarApi};
use avatar_studio_client::flows::{
    AvatarRequestFlow, EMPTY_NOTICE, Gallery, GalleryFetchFlow, GenerationOutcome,
};
use avatar_studio_client::session::{
    DetectedLocation, Identity, MemorySessionStore, SessionStore,
};
use avatar_studio_core::{Ethnicity, Gender, Profile, UserId};
use avatar_studio_integration_tests::{PNG_PIXEL, StubBackend};
use url::Url;

const PROMPT: &str = "a realistic portrait";

fn api_for(stub: &StubBackend) -> HttpAvatarApi {
    let base = Url::parse(&stub.base_url()).unwrap();
    HttpAvatarApi::new(&base, Duration::from_secs(5)).unwrap()
}

fn logged_in(user: &str) -> MemorySessionStore {
    let store = MemorySessionStore::new();
    let identity = Identity {
        user_id: UserId::parse(user).unwrap(),
        password: None,
    };
    let profile = Profile {
        country_of_origin: "Mexico".to_string(),
        country_of_occupation: "USA".to_string(),
        gender: Some(Gender::Female),
        ethnicity: Some(Ethnicity::HispanicOrLatino),
        occupation: "Designer".to_string(),
        ..Profile::default()
    };
    store.save(&identity, &profile).unwrap();
    store.set_session_flag(true).unwrap();
    store
}

#[tokio::test]
async fn test_generate_decrements_from_server_count() {
    let stub = StubBackend::spawn().await.unwrap();
    stub.seed_avatars("alice", 7);
    let flow = AvatarRequestFlow::new(logged_in("alice"), api_for(&stub));

    assert_eq!(flow.enter().await.remaining(), Some(3));

    let GenerationOutcome::Applied(avatar) = flow.generate(PROMPT).await.unwrap() else {
        panic!("result discarded");
    };
    assert_eq!(avatar.remaining, Some(2));
    assert_eq!(avatar.image.as_str(), PNG_PIXEL);
    assert!(avatar.data_uri().starts_with("data:image/png;base64,"));
    assert_eq!(&avatar.bytes[1..4], b"PNG");

    let request = stub.state().generation_requests[0].clone();
    assert_eq!(request["prompt"], PROMPT);
    assert_eq!(request["country"], "unknown");
    assert_eq!(request["countryOfOrigin"], "Mexico");
    assert_eq!(request["gender"], "Female");
}

#[tokio::test]
async fn test_exhausted_quota_sends_nothing() {
    let stub = StubBackend::spawn().await.unwrap();
    stub.seed_avatars("alice", 10);
    let flow = AvatarRequestFlow::new(logged_in("alice"), api_for(&stub));

    flow.enter().await;
    let err = flow.generate(PROMPT).await.unwrap_err();

    assert!(matches!(err, FlowError::QuotaExceeded { .. }));
    assert_eq!(err.user_message(), "You've reached your 10-image limit.");
    assert_eq!(stub.hits("/store-user-avatar"), 0);
}

#[tokio::test]
async fn test_server_limit_is_authoritative_when_counter_unknown() {
    let stub = StubBackend::spawn().await.unwrap();
    stub.seed_avatars("alice", 10);
    // Never entered, so the counter is unknown and the request goes out
    let flow = AvatarRequestFlow::new(logged_in("alice"), api_for(&stub));

    let err = flow.generate(PROMPT).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Avatar generation limit (10) reached for this user."
    );
    assert_eq!(flow.quota().remaining(), Some(0));
    assert_eq!(stub.hits("/store-user-avatar"), 1);
}

#[tokio::test]
async fn test_slow_backend_times_out_and_clears_pending() {
    let stub = StubBackend::spawn().await.unwrap();
    stub.state().generation_delay = Some(Duration::from_secs(1));
    let base = Url::parse(&stub.base_url()).unwrap();
    let api = HttpAvatarApi::new(&base, Duration::from_millis(200)).unwrap();
    let flow = AvatarRequestFlow::new(logged_in("alice"), api);

    let err = flow.generate(PROMPT).await.unwrap_err();

    assert!(matches!(err, FlowError::Api(ApiError::Timeout)), "{err:?}");
    assert_eq!(
        err.user_message(),
        "The server took too long to respond. Please try again."
    );
    assert!(!flow.is_pending());
}

#[tokio::test]
async fn test_detected_country_and_legacy_image_field() {
    let stub = StubBackend::spawn().await.unwrap();
    stub.state().legacy_image_field = true;
    let store = logged_in("alice");
    store
        .update_location(&DetectedLocation {
            country: Some("USA".to_string()),
            coordinates: None,
        })
        .unwrap();
    let flow = AvatarRequestFlow::new(store, api_for(&stub));

    let outcome = flow.generate(PROMPT).await.unwrap();
    assert!(matches!(outcome, GenerationOutcome::Applied(_)));
    assert_eq!(stub.state().generation_requests[0]["country"], "USA");
}

#[tokio::test]
async fn test_gallery_empty_then_populated() {
    let stub = StubBackend::spawn().await.unwrap();
    let store = logged_in("alice");
    let api = api_for(&stub);

    let gallery = GalleryFetchFlow::new(&store, &api).fetch().await.unwrap();
    assert_eq!(gallery, Gallery::Empty);
    assert_eq!(gallery.notice(), Some(EMPTY_NOTICE));

    let flow = AvatarRequestFlow::new(&store, &api);
    flow.generate(PROMPT).await.unwrap();
    flow.generate("a watercolor sketch").await.unwrap();

    let gallery = GalleryFetchFlow::new(&store, &api).fetch().await.unwrap();
    let prompts: Vec<_> = gallery.items().iter().map(|a| a.prompt.as_str()).collect();
    assert_eq!(prompts, [PROMPT, "a watercolor sketch"]);
    assert!(gallery.items().iter().all(|a| a.user_id == "alice"));
    assert!(gallery.items()[0].image.decode().is_ok());
}

#[tokio::test]
async fn test_gallery_accepts_bare_list() {
    let stub = StubBackend::spawn().await.unwrap();
    stub.seed_avatars("alice", 2);
    stub.state().bare_avatar_list = true;
    let store = logged_in("alice");
    let api = api_for(&stub);

    let gallery = GalleryFetchFlow::new(&store, &api).fetch().await.unwrap();
    assert_eq!(gallery.items().len(), 2);
}

#[tokio::test]
async fn test_gallery_without_identity_makes_no_request() {
    let stub = StubBackend::spawn().await.unwrap();
    let store = MemorySessionStore::new();
    let api = api_for(&stub);

    let err = GalleryFetchFlow::new(&store, &api).fetch().await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "User ID missing. Please complete your profile."
    );
    assert_eq!(stub.hits("/avatars"), 0);
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Bind and immediately release a port so nothing is listening on it
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();
    let api = HttpAvatarApi::new(&base, Duration::from_secs(2)).unwrap();
    let store = logged_in("alice");

    let err = GalleryFetchFlow::new(&store, &api).fetch().await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Could not reach the server. Please check your connection."
    );
}
