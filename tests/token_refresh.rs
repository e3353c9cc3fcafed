mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ambillion_client::messages;
use ambillion_client::{Error, Role};
use common::{client_for, signed_in_store};

async fn mount_products(server: &MockServer, token: &str, status: u16, expected: u64) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({ "code": 200, "data": [] }))
    } else {
        ResponseTemplate::new(status).set_body_json(json!({ "message": "jwt expired" }))
    };
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(bearer_token(token))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn unauthorized_request_is_replayed_once_with_refreshed_token() {
    let server = MockServer::start().await;
    mount_products(&server, "T1", 401, 1).await;
    mount_products(&server, "T2", 200, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .and(query_param("refreshToken", "R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": { "token": "T2", "expires": "2099-01-01T00:00:00Z" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store("T1", Some("R1"), Role::Officer);
    let (client, notifier) = client_for(&server, store.clone());

    let products = client.list_products().await.unwrap();

    assert!(products.is_empty());
    let session = store.load().unwrap();
    assert_eq!(session.access_token, "T2");
    assert_eq!(session.refresh_token.as_deref(), Some("R1"));
    assert!(notifier.errors().is_empty());
}

#[tokio::test]
async fn refresh_response_with_rotated_refresh_token() {
    let server = MockServer::start().await;
    mount_products(&server, "T1", 401, 1).await;
    mount_products(&server, "T2", 200, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": { "tokens": { "access": "T2", "refresh": "R2" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store("T1", Some("R1"), Role::Officer);
    let (client, _) = client_for(&server, store.clone());

    client.list_products().await.unwrap();

    assert_eq!(store.load().unwrap().refresh_token.as_deref(), Some("R2"));
}

#[tokio::test]
async fn failed_refresh_is_terminal() {
    let server = MockServer::start().await;
    mount_products(&server, "T1", 401, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Please authenticate"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store("T1", Some("R1"), Role::Officer);
    let (client, notifier) = client_for(&server, store.clone());

    let err = client.list_products().await.unwrap_err();

    assert!(matches!(err, Error::ReauthenticationRequired));
    assert!(err.is_auth());
    assert_eq!(store.load(), None);
    assert_eq!(store.load_profile(), None);
    assert_eq!(notifier.errors(), vec![messages::SESSION_EXPIRED.to_owned()]);
}

#[tokio::test]
async fn missing_refresh_token_needs_reauthentication() {
    let server = MockServer::start().await;
    mount_products(&server, "T1", 401, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = signed_in_store("T1", None, Role::Officer);
    let (client, _) = client_for(&server, store);

    let err = client.list_products().await.unwrap_err();
    assert!(matches!(err, Error::ReauthenticationRequired));
}

#[tokio::test]
async fn second_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    mount_products(&server, "T1", 401, 1).await;
    mount_products(&server, "T2", 401, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "T2" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store("T1", Some("R1"), Role::Officer);
    let (client, _) = client_for(&server, store);

    let err = client.list_products().await.unwrap_err();
    assert!(matches!(err, Error::Auth { status: 401, .. }));
    assert_eq!(err.user_message(), "jwt expired");
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;
    mount_products(&server, "T1", 401, 3).await;
    mount_products(&server, "T2", 200, 3).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access": "T2" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store("T1", Some("R1"), Role::Officer);
    let (client, _) = client_for(&server, store.clone());

    let (a, b, c) = tokio::join!(
        client.list_products(),
        client.list_products(),
        client.list_products()
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(store.load().unwrap().access_token, "T2");
}

#[tokio::test]
async fn concurrent_requests_fail_together_when_refresh_fails() {
    let server = MockServer::start().await;
    mount_products(&server, "T1", 401, 2).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store("T1", Some("R1"), Role::Officer);
    let (client, _) = client_for(&server, store);

    let (a, b) = tokio::join!(client.list_products(), client.list_products());

    assert!(matches!(a, Err(Error::ReauthenticationRequired)));
    assert!(matches!(b, Err(Error::ReauthenticationRequired)));
}
