#![allow(dead_code)]

use std::sync::Arc;

use clientele_core::api::{ChannelNotifier, Notification};
use clientele_core::{ApiClient, Config, SessionStore, UserIdentity};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

pub const REDIRECT_URI: &str = "http://localhost:5173/login";

pub fn test_config(base_url: &str) -> Config {
    Config {
        api_base_url: base_url.to_string(),
        oauth_authorize_url: "https://auth.example.com/oauth/authorize".to_string(),
        oauth_client_id: "dashboard".to_string(),
        redirect_uri: REDIRECT_URI.to_string(),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

pub fn test_user() -> UserIdentity {
    UserIdentity {
        id: "u1".to_string(),
        name: "Test".to_string(),
        email: "t@x.com".to_string(),
        role: "admin".to_string(),
        avatar: None,
    }
}

pub fn user_json() -> Value {
    json!({"id": "u1", "name": "Test", "email": "t@x.com", "role": "admin"})
}

pub fn logged_in_session(access: &str, refresh: &str) -> Arc<SessionStore> {
    let session = SessionStore::in_memory();
    session.login(access.to_string(), refresh.to_string(), test_user());
    Arc::new(session)
}

pub struct Harness {
    pub client: ApiClient,
    pub session: Arc<SessionStore>,
    pub notifications: UnboundedReceiver<Notification>,
}

impl Harness {
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Self {
        let (notifier, notifications) = ChannelNotifier::new();
        let client = ApiClient::new(&test_config(base_url), session.clone(), Arc::new(notifier))
            .expect("client should build");
        Self {
            client,
            session,
            notifications,
        }
    }

    /// Everything announced so far.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut seen = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            seen.push(n);
        }
        seen
    }
}

pub fn customer_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": "Acme Corp",
        "email": "hello@acme.test",
        "company": "Acme",
        "status": status,
        "type": "business",
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-02T00:00:00Z"
    })
}
