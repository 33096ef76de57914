use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::http::HttpClient;
use crate::roblox_api::{
    asset_type_from_image_url, RobloxApiError, RobloxClient, RobloxEndpoints, RobloxIdentifier,
    RobloxPose, RobloxUser, ThumbnailPolling, ThumbnailState,
};

fn client(mock_server: &MockServer, attempts: u32) -> RobloxClient {
    RobloxClient::new(
        HttpClient::new().unwrap(),
        RobloxEndpoints::all(&mock_server.uri()),
        ThumbnailPolling {
            attempts,
            interval: Duration::ZERO,
        },
    )
}

#[test]
fn digits_are_user_ids() {
    assert_eq!(
        RobloxIdentifier::parse("5111841651").unwrap(),
        RobloxIdentifier::UserId(5111841651)
    );
    assert_eq!(
        RobloxIdentifier::parse("Alex1331xela").unwrap(),
        RobloxIdentifier::Username("Alex1331xela".to_owned())
    );
    assert_eq!(
        RobloxIdentifier::parse("+12").unwrap(),
        RobloxIdentifier::Username("+12".to_owned())
    );
    assert!(matches!(
        RobloxIdentifier::parse(""),
        Err(RobloxApiError::EmptyIdentifier)
    ));
}

#[test]
fn digits_past_u64_are_not_looked_up_as_a_username() {
    let err = RobloxIdentifier::parse("184467440737095516150").unwrap_err();

    assert!(
        matches!(&err, RobloxApiError::UnknownUser { identifier } if identifier == "184467440737095516150"),
        "{err:?}"
    );
}

#[test]
fn asset_type_comes_from_cdn_path() {
    assert_eq!(
        asset_type_from_image_url("https://tr.rbxcdn.com/30DAY-Hat-abc/700/700/Hat/Png/noFilter"),
        "Hat"
    );
    assert_eq!(
        asset_type_from_image_url("https://tr.rbxcdn.com/x/700/700/Shirt/Png/noFilter?v=2"),
        "Shirt"
    );
    assert_eq!(asset_type_from_image_url("https://example.com/a.png"), "asset");
}

#[tokio::test]
async fn resolves_user_by_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/users"))
        .and(body_json(json!({ "userIds": [5111841651u64], "excludeBannedUsers": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "hasVerifiedBadge": false,
                "id": 5111841651u64,
                "name": "Alex1331xela",
                "displayName": "Alex"
            }]
        })))
        .mount(&mock_server)
        .await;

    let user = client(&mock_server, 1)
        .resolve_user(&RobloxIdentifier::UserId(5111841651))
        .await
        .unwrap();

    assert_eq!(
        user,
        RobloxUser {
            id: 5111841651,
            name: "Alex1331xela".to_owned(),
            display_name: "Alex".to_owned(),
        }
    );
}

#[tokio::test]
async fn resolves_user_by_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/usernames/users"))
        .and(body_json(json!({ "usernames": ["Alex1331xela"], "excludeBannedUsers": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "requestedUsername": "Alex1331xela",
                "hasVerifiedBadge": false,
                "id": 42,
                "name": "Alex1331xela",
                "displayName": "Alex"
            }]
        })))
        .mount(&mock_server)
        .await;

    let user = client(&mock_server, 1)
        .resolve_user(&RobloxIdentifier::Username("Alex1331xela".to_owned()))
        .await
        .unwrap();

    assert_eq!(user.id, 42);
}

#[tokio::test]
async fn empty_lookup_means_unknown_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, 1)
        .resolve_user(&RobloxIdentifier::UserId(1))
        .await
        .unwrap_err();

    assert!(matches!(err, RobloxApiError::UnknownUser { .. }), "{err:?}");
}

#[tokio::test]
async fn currently_wearing_is_deduplicated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/7/currently-wearing"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "assetIds": [30, 10, 30, 20] })),
        )
        .mount(&mock_server)
        .await;

    let assets = client(&mock_server, 1).currently_wearing(7).await.unwrap();

    assert_eq!(assets, vec![10, 20, 30]);
}

#[tokio::test]
async fn avatar_thumbnail_returns_image_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/avatar-bust"))
        .and(query_param("userIds", "7"))
        .and(query_param("size", "420x420"))
        .and(query_param("format", "png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "targetId": 7, "state": "Completed", "imageUrl": "https://tr.rbxcdn.com/bust" }]
        })))
        .mount(&mock_server)
        .await;

    let url = client(&mock_server, 1)
        .avatar_image_url(7, RobloxPose::AvatarBust)
        .await
        .unwrap();

    assert_eq!(url, "https://tr.rbxcdn.com/bust");
}

#[tokio::test]
async fn pending_thumbnail_is_polled_until_complete() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "targetId": 5, "state": "Pending", "imageUrl": null }]
        })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/assets"))
        .and(query_param("assetIds", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "targetId": 5, "state": "Completed", "imageUrl": "https://tr.rbxcdn.com/hat" }]
        })))
        .mount(&mock_server)
        .await;

    let url = client(&mock_server, 3).asset_image_url(5).await.unwrap();

    assert_eq!(url, "https://tr.rbxcdn.com/hat");
}

#[tokio::test]
async fn thumbnail_gives_up_after_configured_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "targetId": 5, "state": "Pending", "imageUrl": null }]
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, 2).asset_image_url(5).await.unwrap_err();

    assert!(
        matches!(err, RobloxApiError::ThumbnailNotReady { attempts: 2, .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn blocked_thumbnail_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "targetId": 5, "state": "Blocked", "imageUrl": "" }]
        })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, 3).asset_image_url(5).await.unwrap_err();

    assert!(
        matches!(
            err,
            RobloxApiError::ThumbnailFailed {
                state: ThumbnailState::Blocked,
                ..
            }
        ),
        "{err:?}"
    );
}
