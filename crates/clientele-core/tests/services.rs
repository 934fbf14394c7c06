mod common;

use std::sync::Arc;

use clientele_core::auth::{OAuthError, OAuthSettings, OAuthStateStore};
use clientele_core::dashboard::DashboardMetrics;
use clientele_core::filters::CustomerFilter;
use clientele_core::models::CustomerStatus;
use clientele_core::services::{AuthService, CustomerService, LoginError};
use clientele_core::{ApiError, SessionStore};
use mockito::{Matcher, Server};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{customer_json, logged_in_session, test_config, user_json, Harness, REDIRECT_URI};

fn page_json(customers: Vec<serde_json::Value>, total: u64, page: u64, limit: u64) -> String {
    json!({
        "data": customers,
        "meta": {"total": total, "page": page, "limit": limit, "totalPages": total.div_ceil(limit)}
    })
    .to_string()
}

#[tokio::test]
async fn list_customers_sends_filter_as_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/customers")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "2".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
            Matcher::UrlEncoded("status".into(), "lead".into()),
            Matcher::UrlEncoded("search".into(), "acme corp".into()),
        ]))
        .with_status(200)
        .with_body(page_json(vec![customer_json("c1", "lead")], 11, 2, 10))
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let service = CustomerService::new(h.client.clone());
    let filter = CustomerFilter {
        status: Some(CustomerStatus::Lead),
        search: "  acme corp ".to_string(),
    };
    let page = service.list_customers(2, 10, &filter).await.unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.meta.showing_range(), (11, 11));
    assert!(!page.meta.has_next());
    mock.assert_async().await;
}

#[tokio::test]
async fn list_customers_omits_empty_filter() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/customers")
        .match_query(Matcher::Exact("page=1&limit=10".to_string()))
        .with_status(200)
        .with_body(page_json(vec![], 0, 1, 10))
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let service = CustomerService::new(h.client.clone());
    let page = service
        .list_customers(1, 10, &CustomerFilter::default())
        .await
        .unwrap();

    assert!(page.data.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn delete_customer_accepts_no_content() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/customers/c1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    CustomerService::new(h.client.clone())
        .delete_customer("c1")
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn delete_contact_ignores_response_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/customers/c1/contacts/k1")
        .with_status(200)
        .with_body(r#"{"id": "k1", "deleted": true}"#)
        .expect(1)
        .create_async()
        .await;

    let mut h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    CustomerService::new(h.client.clone())
        .delete_contact("c1", "k1")
        .await
        .unwrap();

    assert!(h.drain().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn superseded_list_fetch_is_cancelled_quietly() {
    let server = Server::new_async().await;
    let mut h = Harness::new(&server.url(), logged_in_session("a1", "r1"));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = CustomerService::new(h.client.clone())
        .list_customers_with_cancel(1, 10, &CustomerFilter::default(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Cancelled));
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn list_fetch_with_live_token_returns_page() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/customers")
        .match_query(Matcher::Exact("page=1&limit=10".to_string()))
        .with_status(200)
        .with_body(
            json!({
                "data": [customer_json("c1", "active")],
                "meta": {"total": 1, "page": 1, "limit": 10, "totalPages": 1}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let page = CustomerService::new(h.client.clone())
        .list_customers_with_cancel(1, 10, &CustomerFilter::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.meta.total, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn overview_tolerates_failed_contacts() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/customers/c1")
        .with_status(200)
        .with_body(customer_json("c1", "active").to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/customers/c1/contacts")
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", "/customers/c1/activities")
        .with_status(200)
        .with_body(
            json!([{
                "id": "a1",
                "customerId": "c1",
                "type": "call",
                "title": "Intro call",
                "createdAt": "2024-01-03T00:00:00Z",
                "createdBy": "u1"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let mut h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let overview = CustomerService::new(h.client.clone())
        .customer_overview("c1")
        .await
        .unwrap();

    assert_eq!(overview.customer.id, "c1");
    assert!(overview.contacts.is_empty());
    assert_eq!(overview.activities.len(), 1);
    assert_eq!(h.drain().len(), 1);
}

#[tokio::test]
async fn dashboard_degrades_to_zero_on_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/customers")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let metrics = DashboardMetrics::load(&CustomerService::new(h.client.clone())).await;

    assert_eq!(metrics, DashboardMetrics::default());
}

#[tokio::test]
async fn dashboard_requests_first_five() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/customers")
        .match_query(Matcher::Exact("page=1&limit=5".to_string()))
        .with_status(200)
        .with_body(page_json(
            vec![customer_json("c1", "active"), customer_json("c2", "inactive")],
            20,
            1,
            5,
        ))
        .expect(1)
        .create_async()
        .await;

    let h = Harness::new(&server.url(), logged_in_session("a1", "r1"));
    let metrics = DashboardMetrics::fetch(&CustomerService::new(h.client.clone()))
        .await
        .unwrap();

    assert_eq!(metrics.total_customers, 20);
    assert_eq!(metrics.active_customers, 1);
    assert_eq!(metrics.new_customers, 3);
    assert_eq!(metrics.active_share_percent(), 5);
    mock.assert_async().await;
}

fn auth_service(base_url: &str, session: Arc<SessionStore>, dir: &std::path::Path) -> (AuthService, Harness) {
    let h = Harness::new(base_url, session);
    let service = AuthService::new(
        h.client.clone(),
        OAuthSettings::from_config(&test_config(base_url)),
        OAuthStateStore::in_dir(dir),
    );
    (service, h)
}

fn state_param(url: &reqwest::Url) -> String {
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("authorization URL should carry state")
}

#[tokio::test]
async fn complete_login_exchanges_code_and_logs_in() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/auth/oauth/token")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"code": "abc", "redirectUri": REDIRECT_URI})))
        .with_status(200)
        .with_body(json!({"accessToken": "a1", "refreshToken": "r1", "user": user_json()}).to_string())
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (service, h) = auth_service(&server.url(), Arc::new(SessionStore::in_memory()), dir.path());

    let url = service.begin_login().unwrap();
    let state = state_param(&url);
    let redirect = format!("{}?code=abc&state={}", REDIRECT_URI, state);
    let user = service.complete_login(&redirect).await.unwrap();

    assert_eq!(user.email, "t@x.com");
    assert!(h.session.is_authenticated());
    assert_eq!(h.session.access_token().as_deref(), Some("a1"));
    assert_eq!(h.session.refresh_token().as_deref(), Some("r1"));
    token.assert_async().await;
}

#[tokio::test]
async fn complete_login_rejects_mismatched_state() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/auth/oauth/token")
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (service, h) = auth_service(&server.url(), Arc::new(SessionStore::in_memory()), dir.path());
    service.begin_login().unwrap();

    let redirect = format!("{}?code=abc&state=forged", REDIRECT_URI);
    let err = service.complete_login(&redirect).await.unwrap_err();
    assert!(matches!(err, LoginError::OAuth(OAuthError::StateMismatch)));

    // The nonce was consumed, so replaying fails too
    let err = service.complete_login(&redirect).await.unwrap_err();
    assert!(matches!(err, LoginError::OAuth(OAuthError::NoPendingState)));

    assert!(!h.session.is_authenticated());
    token.assert_async().await;
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/logout")
        .match_header("authorization", "Bearer a1")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (service, h) = auth_service(&server.url(), logged_in_session("a1", "r1"), dir.path());
    service.logout().await;

    assert!(!h.session.is_authenticated());
    assert!(h.session.user().is_none());
    mock.assert_async().await;
}
