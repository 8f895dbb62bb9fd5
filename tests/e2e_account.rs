//! E2E tests for setup, login and posting authorization

mod common;

use common::TestServer;
use perch::data::UserScope;

#[tokio::test]
async fn setup_is_single_use() {
    let server = TestServer::new().await;

    let first = server.setup_account("alice", "pw123").await;
    assert_eq!(first.status(), reqwest::StatusCode::OK);
    assert!(first.text().await.unwrap().contains("Setup Complete"));

    // Second setup must fail and leave the first account untouched.
    let second = server.setup_account("mallory", "hunter2").await;
    assert_eq!(second.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        second
            .text()
            .await
            .unwrap()
            .contains("Setup Failed; User already exists")
    );

    assert!(server.login("alice", "pw123").await.is_some());
    assert!(server.login("mallory", "hunter2").await.is_none());
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let server = TestServer::new().await;
    server.setup_account("alice", "pw123").await;

    let response = server
        .client
        .post(server.url("/login"))
        .form(&[("username", "alice"), ("password", "wrong")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("Login Failed; Incorrect username or password")
    );
}

#[tokio::test]
async fn login_before_setup_redirects_to_setup() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/login"))
        .form(&[("username", "alice"), ("password", "pw123")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/setup")
    );
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let server = TestServer::new().await;
    server.setup_account("alice", "pw123").await;

    let cookie = server.login("alice", "pw123").await.expect("session granted");
    assert!(cookie.starts_with("session="));

    // The cookie grants access to the feed.
    let home = server
        .client
        .get(server.url("/"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(home.status(), reqwest::StatusCode::OK);
    assert!(home.text().await.unwrap().contains("Logged in as @alice"));
}

#[tokio::test]
async fn post_create_without_session_is_forbidden() {
    let server = TestServer::new().await;
    server.setup_account("alice", "pw123").await;

    let response = server
        .client
        .post(server.url("/post/create"))
        .form(&[("content", "sneaky")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

    // Bad sessions also clear the cookie.
    let response = server.create_post("session=garbage", "sneaky").await;
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    let cleared = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cleared.starts_with("session="));
}

#[tokio::test]
async fn index_walks_setup_login_feed_states() {
    let server = TestServer::new().await;

    // No local user yet: setup form.
    let page = server.client.get(server.url("/")).send().await.unwrap();
    assert!(page.text().await.unwrap().contains("/setup/complete"));

    server.setup_account("alice", "pw123").await;

    // User exists, no session: login form.
    let page = server.client.get(server.url("/")).send().await.unwrap();
    assert!(page.text().await.unwrap().contains("/login"));

    // The stored user is local and carries a key pair.
    let record = server
        .state
        .db
        .find_user("alice", &UserScope::Local)
        .await
        .unwrap()
        .expect("alice exists");
    assert_eq!(record.user.host, None);
    let key = record.key.expect("key pair");
    assert!(key.public_key_pem.contains("BEGIN PUBLIC KEY"));
    assert!(
        key.private_key_pem
            .expect("private key for local scope")
            .contains("BEGIN PRIVATE KEY")
    );
}
