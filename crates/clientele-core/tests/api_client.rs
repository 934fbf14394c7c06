mod common;

use std::sync::Arc;

use clientele_core::api::NotificationLevel;
use clientele_core::auth::SessionStorage;
use clientele_core::{ApiError, ApiRequest, SessionState, SessionStore};
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use common::{customer_json, logged_in_session, Harness};

#[tokio::test]
async fn attaches_bearer_token_and_json_content_type() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/customers/c1")
        .match_header("authorization", "Bearer a1")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(customer_json("c1", "active").to_string())
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let body: Value = h.client.get("/customers/c1").await.unwrap();

    assert_eq!(body["id"], "c1");
    mock.assert_async().await;
}

#[tokio::test]
async fn omits_authorization_without_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/health")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"ok": true}"#)
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), Arc::new(SessionStore::in_memory()));
    let body = h.client.send(ApiRequest::get("/health")).await.unwrap();

    assert_eq!(body, json!({"ok": true}));
    mock.assert_async().await;
}

#[tokio::test]
async fn refreshes_once_and_retries_after_401() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/customers")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"refreshToken": "r1"})))
        .with_status(200)
        .with_body(r#"{"accessToken": "new"}"#)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/customers")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
        ]))
        .match_header("authorization", "Bearer new")
        .with_status(200)
        .with_body(r#"{"data": [], "meta": {"total": 0, "page": 1, "limit": 10, "totalPages": 0}}"#)
        .expect(1)
        .create_async()
        .await;

    let mut h = Harness::new(&server.url(), logged_in_session("old", "r1"));
    let request = ApiRequest::get("/customers").query("page", 1).query("limit", 10);
    let body = h.client.send(request).await.unwrap();

    assert_eq!(body["meta"]["total"], 0);
    assert_eq!(h.session.access_token().as_deref(), Some("new"));
    assert_eq!(h.session.refresh_token().as_deref(), Some("r1"));
    assert!(h.session.is_authenticated());
    assert!(h.drain().is_empty());

    rejected.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn retry_preserves_request_body() {
    let mut server = Server::new_async().await;
    let body = json!({"name": "Acme", "status": "lead"});
    let rejected = server
        .mock("POST", "/customers")
        .match_header("authorization", "Bearer old")
        .match_body(Matcher::Json(body.clone()))
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_body(r#"{"accessToken": "new"}"#)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("POST", "/customers")
        .match_header("authorization", "Bearer new")
        .match_body(Matcher::Json(body.clone()))
        .with_status(201)
        .with_body(customer_json("c9", "lead").to_string())
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("old", "r1"));
    let created: Value = h.client.post("/customers", &body).await.unwrap();

    assert_eq!(created["id"], "c9");
    rejected.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn unauthorized_without_refresh_token_requires_login() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/customers/c1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    // A restored session can hold an access token with no refresh token.
    let dir = tempfile::tempdir().unwrap();
    let storage = SessionStorage::in_dir(dir.path());
    std::fs::write(
        storage.path(),
        r#"{"state": {"isAuthenticated": true, "user": {"id": "u1", "name": "Test", "email": "t@x.com", "role": "admin"}, "accessToken": "a1", "refreshToken": null}, "version": 0}"#,
    )
    .unwrap();
    let session = Arc::new(SessionStore::open(storage));
    assert!(session.is_authenticated());

    let mut h = Harness::new(&server.url(), session);
    let err = h.client.send(ApiRequest::get("/customers/c1")).await.unwrap_err();

    assert!(matches!(err, ApiError::AuthenticationRequired));
    assert!(!h.session.is_authenticated());
    assert!(h.session.access_token().is_none());

    let seen = h.drain();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].level, NotificationLevel::Error);
    assert_eq!(seen[0].message, "Authentication required. Please log in.");

    mock.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn failed_refresh_expires_session() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/customers/c1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(500)
        .with_body(r#"{"message": "boom"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut h = Harness::new(&server.url(), logged_in_session("old", "r1"));
    let err = h.client.send(ApiRequest::get("/customers/c1")).await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(h.session.snapshot(), SessionState::default());
    assert_eq!(h.drain()[0].message, "Your session has expired. Please log in again.");
    refresh.assert_async().await;
}

#[tokio::test]
async fn refresh_without_access_token_expires_session() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/customers/c1")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_body(r#"{"refreshToken": "r2"}"#)
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("old", "r1"));
    let err = h.client.send(ApiRequest::get("/customers/c1")).await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(!h.session.is_authenticated());
}

#[tokio::test]
async fn second_401_after_refresh_does_not_refresh_again() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/customers/c1")
        .with_status(401)
        .expect(2)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_body(r#"{"accessToken": "new"}"#)
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("old", "r1"));
    let err = h.client.send(ApiRequest::get("/customers/c1")).await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(!h.session.is_authenticated());
    rejected.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", Matcher::Regex(r"^/customers/c[12]$".to_string()))
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .expect_at_least(1)
        .expect_at_most(2)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_body(r#"{"accessToken": "new"}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", Matcher::Regex(r"^/customers/c[12]$".to_string()))
        .match_header("authorization", "Bearer new")
        .with_status(200)
        .with_body(r#"{"ok": true}"#)
        .expect_at_least(1)
        .expect_at_most(2)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("old", "r1"));
    let (a, b) = tokio::join!(
        h.client.send(ApiRequest::get("/customers/c1")),
        h.client.send(ApiRequest::get("/customers/c2")),
    );

    assert_eq!(a.unwrap(), json!({"ok": true}));
    assert_eq!(b.unwrap(), json!({"ok": true}));
    assert_eq!(h.session.access_token().as_deref(), Some("new"));
    refresh.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn no_content_yields_empty_object() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/customers/c1")
        .with_status(204)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let body = h.client.send(ApiRequest::delete("/customers/c1")).await.unwrap();

    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn delete_verb_accepts_no_content_as_unit() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/customers/c1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let mut h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let result: Result<(), ApiError> = h.client.delete("/customers/c1").await;

    assert!(result.is_ok());
    assert!(h.drain().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn logout_during_refresh_does_not_retry() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/customers/c1")
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/customers/c1")
        .match_header("authorization", "Bearer new")
        .with_status(200)
        .with_body(customer_json("c1", "active").to_string())
        .expect(0)
        .create_async()
        .await;

    let session = logged_in_session("old", "r1");
    let racing = session.clone();
    server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_body_from_request(move |_| {
            // The user logs out while the refresh is on the wire
            racing.logout();
            br#"{"accessToken": "new"}"#.to_vec()
        })
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), session);
    let err = h.client.send(ApiRequest::get("/customers/c1")).await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(!h.session.is_authenticated());
    assert!(h.session.access_token().is_none());
    retried.assert_async().await;
}

#[tokio::test]
async fn error_message_comes_from_body_and_is_announced() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/customers")
        .with_status(422)
        .with_body(r#"{"message": "Email already in use"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/customers/missing")
        .with_status(404)
        .with_body("not json")
        .create_async()
        .await;

    let mut h = Harness::new(&server.url(), logged_in_session("a1", "r1"));

    let err = h
        .client
        .post::<Value, _>("/customers", &json!({"email": "dup@acme.test"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 422, .. }));
    assert_eq!(err.to_string(), "Email already in use");

    let err = h.client.get::<Value>("/customers/missing").await.unwrap_err();
    assert_eq!(err.to_string(), "API Error: 404 Not Found");

    let messages: Vec<String> = h.drain().into_iter().map(|n| n.message).collect();
    assert_eq!(messages, vec!["Email already in use", "API Error: 404 Not Found"]);
    // Non-auth failures leave the session alone
    assert!(h.session.is_authenticated());
}

#[tokio::test]
async fn undecodable_success_body_is_reported() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/customers/c1")
        .with_status(200)
        .with_body("<html></html>")
        .create_async()
        .await;

    let mut h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let err = h.client.send(ApiRequest::get("/customers/c1")).await.unwrap_err();

    assert!(matches!(err, ApiError::Decode(_)));
    assert_eq!(h.drain().len(), 1);
}

#[tokio::test]
async fn cancelled_request_is_not_announced() {
    let server = Server::new_async().await;
    let mut h = Harness::new(&server.url(), logged_in_session("a1", "r1"));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = h
        .client
        .send_with_cancel(ApiRequest::get("/customers"), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Cancelled));
    assert!(h.drain().is_empty());
    assert!(h.session.is_authenticated());
}

#[tokio::test]
async fn network_failure_is_announced() {
    // Nothing listens on port 1
    let mut h = Harness::new("http://127.0.0.1:1", logged_in_session("a1", "r1"));
    let err = h.client.send(ApiRequest::get("/customers")).await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_) | ApiError::Timeout));
    let seen = h.drain();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].message, err.to_string());
}
