//! `HttpAvatarApi` against the stub backend's REST surface.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use avatar_studio_client::api::{
    ApiError, AvatarBackend, AvatarRequest, HttpAvatarApi, UserDetails, describe_error_body,
};
use avatar_studio_core::{Profile, UserId};
use avatar_studio_integration_tests::{STUB_LIMIT, StubBackend};
use url::Url;

fn api_for(stub: &StubBackend) -> HttpAvatarApi {
    let base = Url::parse(&stub.base_url()).unwrap();
    HttpAvatarApi::new(&base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_avatar_count_reports_remaining() {
    let stub = StubBackend::spawn().await.unwrap();
    stub.seed_avatars("bob", 4);
    let api = api_for(&stub);

    let status = api.avatar_count(&UserId::parse("bob").unwrap()).await.unwrap();
    assert_eq!(status.remaining, STUB_LIMIT - 4);
    assert_eq!(status.count, Some(4));

    let fresh = api.avatar_count(&UserId::parse("carol").unwrap()).await.unwrap();
    assert_eq!(fresh.remaining, STUB_LIMIT);
}

#[tokio::test]
async fn test_validation_errors_render_field_and_message() {
    let stub = StubBackend::spawn().await.unwrap();
    let api = api_for(&stub);
    let id = UserId::parse("bob").unwrap();
    let request = AvatarRequest::new(&id, &Profile::default(), None, "");

    let err = api.generate_avatar(&request).await.unwrap_err();
    let ApiError::Status { status, message } = err else {
        panic!("expected a status error, got {err:?}");
    };
    assert_eq!(status, 422);
    assert_eq!(message, "body.prompt - field required");
}

#[tokio::test]
async fn test_raw_error_body_shape() {
    let stub = StubBackend::spawn().await.unwrap();
    let response = reqwest::Client::new()
        .post(format!("{}/store-user-avatar", stub.base_url()))
        .json(&serde_json::json!({ "prompt": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
    let body = response.text().await.unwrap();
    assert_eq!(describe_error_body(422, &body), "body.user_id - field required");
}

#[tokio::test]
async fn test_store_user_details_returns_acknowledgement() {
    let stub = StubBackend::spawn().await.unwrap();
    let api = api_for(&stub);
    let details = UserDetails::new(&UserId::parse("bob").unwrap(), &Profile::default());

    let ack = api.store_user_details(&details).await.unwrap();
    assert_eq!(ack["message"], "User details stored successfully");
    assert_eq!(stub.state().details[0]["user_id"], "bob");
}

#[tokio::test]
async fn test_unparsable_error_body_falls_back_to_excerpt() {
    let stub = StubBackend::spawn().await.unwrap();
    stub.state().fail_details = true;
    let api = api_for(&stub);
    let details = UserDetails::new(&UserId::parse("bob").unwrap(), &Profile::default());

    let err = api.store_user_details(&details).await.unwrap_err();
    assert_eq!(err.to_string(), "Server error: 500 - Internal Server Error");
}

#[tokio::test]
async fn test_base_url_path_prefix_is_kept() {
    let stub = StubBackend::spawn().await.unwrap();
    // The stub serves at the root, so a prefixed base URL must miss
    let base = Url::parse(&format!("{}/api/", stub.base_url())).unwrap();
    let api = HttpAvatarApi::new(&base, Duration::from_secs(5)).unwrap();

    let err = api
        .avatar_count(&UserId::parse("bob").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(stub.hits("/avatar-count"), 0);
}
