//! E2E tests for WebFinger discovery

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn webfinger_resolves_local_account() {
    let server = TestServer::new().await;
    server.setup_account("alice", "pw123").await;

    let response = server
        .client
        .get(server.url("/.well-known/webfinger?resource=acct:alice@test.example.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/jrd+json")
    );

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["subject"], "acct:alice@test.example.com");
    assert_eq!(json["aliases"][0], "https://test.example.com/@alice");
    assert_eq!(json["links"][0]["rel"], "self");
    assert_eq!(json["links"][0]["type"], "application/activity+json");
    assert_eq!(json["links"][0]["href"], "https://test.example.com/@alice");
}

#[tokio::test]
async fn webfinger_rejects_foreign_host_regardless_of_username() {
    let server = TestServer::new().await;
    server.setup_account("alice", "pw123").await;

    let response = server
        .client
        .get(server.url("/.well-known/webfinger?resource=acct:alice@elsewhere.example"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webfinger_rejects_unknown_user() {
    let server = TestServer::new().await;
    server.setup_account("alice", "pw123").await;

    let response = server
        .client
        .get(server.url("/.well-known/webfinger?resource=acct:bob@test.example.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webfinger_rejects_malformed_resource() {
    let server = TestServer::new().await;
    server.setup_account("alice", "pw123").await;

    let response = server
        .client
        .get(server.url("/.well-known/webfinger?resource=alice@test.example.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
