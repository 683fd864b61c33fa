//! Integration tests for the Portal API client

#![cfg(feature = "client")]

use portal_core::{CredentialPair, CredentialStore, MemoryCredentialStore};
use portal_http::client::{ApiClient, FetchBody, FetchRequest, error::ClientError};
use reqwest::{StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{any, body_json, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with(server: &MockServer, pair: CredentialPair) -> (ApiClient, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::with_pair(pair));
    let client = ApiClient::builder()
        .base_url(server.uri())
        .store(store.clone())
        .build()
        .unwrap();
    (client, store)
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = ApiClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_base_url_trailing_slash_trimmed() {
    let client = ApiClient::new("http://localhost:8000/").unwrap();
    assert_eq!(client.base_url(), "http://localhost:8000");
}

#[tokio::test]
async fn test_attaches_bearer_and_default_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups/"))
        .and(header_eq("authorization", "Bearer a1"))
        .and(header_eq("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, CredentialPair::new("a1", "r1"));
    let groups: Vec<Value> = client.get_json("/groups/").await.unwrap();
    assert_eq!(groups.len(), 1);
}

#[tokio::test]
async fn test_caller_content_type_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts/"))
        .and(header_eq("content-type", "multipart/form-data; boundary=xyz"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, CredentialPair::new("a1", "r1"));
    let request = FetchRequest::new(reqwest::Method::POST, "/posts/")
        .header(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("multipart/form-data; boundary=xyz"),
        )
        .body(FetchBody::Bytes("--xyz--".into()));
    let response = client.fetch(request).await.unwrap();
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_retries_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/user"))
        .and(header_eq("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .and(body_json(json!({"refresh": "r1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/user"))
        .and(header_eq("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with(&server, CredentialPair::new("stale", "r1"));
    let user: Value = client.get_json("/accounts/user").await.unwrap();
    assert_eq!(user["username"], "ada");

    let stored = store.load().await.unwrap();
    assert_eq!(stored.access.as_deref(), Some("fresh"));
    assert_eq!(stored.refresh.as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_retry_unauthorized_is_returned_without_second_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "a2", "refresh": "r2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with(&server, CredentialPair::new("a1", "r1"));
    let response = client.fetch(FetchRequest::get("/posts/")).await.unwrap();
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.load().await.unwrap().refresh.as_deref(), Some("r2"));
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, CredentialPair::default());
    let err = client.fetch(FetchRequest::get("/groups/")).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(
        portal_http::client::auth::reauth_target(&client, &err, "/groups/").as_deref(),
        Some("/login?next=%2Fgroups%2F")
    );
}

#[tokio::test]
async fn test_rejected_refresh_clears_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with(&server, CredentialPair::new("a1", "revoked"));
    let err = client.fetch(FetchRequest::get("/groups/")).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_unauthorized_calls_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups/"))
        .and(header_eq("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/"))
        .and(header_eq("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "fresh", "refresh": "r2"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, CredentialPair::new("stale", "r1"));
    let (a, b) = tokio::join!(
        client.fetch(FetchRequest::get("/groups/")),
        client.fetch(FetchRequest::get("/groups/")),
    );
    assert!(a.unwrap().is_success());
    assert!(b.unwrap().is_success());
}

#[tokio::test]
async fn test_cancelled_call_is_aborted_without_touching_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "a2"})))
        .expect(0)
        .mount(&server)
        .await;

    let (client, store) = client_with(&server, CredentialPair::new("a1", "r1"));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client
        .fetch_with_cancel(FetchRequest::get("/posts/"), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_aborted());
    assert_eq!(
        store.load().await.unwrap(),
        CredentialPair::new("a1", "r1")
    );
}

#[tokio::test]
async fn test_already_cancelled_call_is_never_sent() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, CredentialPair::new("a1", "r1"));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client
        .fetch_with_cancel(FetchRequest::get("/posts/"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Aborted));
}

#[tokio::test]
async fn test_error_status_maps_to_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/99"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, CredentialPair::new("a1", "r1"));
    let err = client.get_json::<Value>("/posts/99").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(message) if message == "missing"));
}

#[tokio::test]
async fn test_login_stores_pair_and_logout_clears() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token/"))
        .and(body_json(json!({"username": "ada", "password": "pw"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "a1", "refresh": "r1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with(&server, CredentialPair::default());
    let pair = client
        .login("/auth/token/", &json!({"username": "ada", "password": "pw"}))
        .await
        .unwrap();
    assert_eq!(pair, CredentialPair::new("a1", "r1"));
    assert_eq!(store.load().await.unwrap(), pair);

    client.logout().await.unwrap();
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_login_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let (client, store) = client_with(&server, CredentialPair::default());
    let err = client
        .login("/auth/token/", &json!({"username": "ada", "password": "wrong"}))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_current_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/user"))
        .and(header_eq("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ada"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/user"))
        .and(header_eq("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, CredentialPair::new("good", "r1"));
    assert_eq!(client.current_user().await.unwrap()["username"], "ada");

    let (client, _) = client_with(&server, CredentialPair::new("stale", "r1"));
    assert!(client.current_user().await.is_none());

    let (client, _) = client_with(&server, CredentialPair::default());
    assert!(client.current_user().await.is_none());
}

#[tokio::test]
async fn test_foreign_origin_never_receives_credentials() {
    let server = MockServer::start().await;
    let foreign = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&foreign)
        .await;

    let (client, store) = client_with(&server, CredentialPair::new("a1", "r1"));
    let err = client
        .fetch(FetchRequest::get(format!("{}/accounts/user", foreign.uri())))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ForeignOrigin(_)));
    assert_eq!(store.load().await.unwrap(), CredentialPair::new("a1", "r1"));
}

#[tokio::test]
async fn test_absolute_url_on_own_origin_is_allowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups/"))
        .and(header_eq("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, CredentialPair::new("a1", "r1"));
    let response = client
        .fetch(FetchRequest::get(format!("{}/groups/", server.uri())))
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_abort_during_refresh_still_persists_rotated_pair() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "a2", "refresh": "r2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with(&server, CredentialPair::new("a1", "r1"));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client
        .fetch_with_cancel(FetchRequest::get("/posts/"), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_aborted());

    let mut stored = store.load().await.unwrap();
    for _ in 0..50 {
        if stored.access.as_deref() == Some("a2") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        stored = store.load().await.unwrap();
    }
    assert_eq!(stored, CredentialPair::new("a2", "r2"));
}
