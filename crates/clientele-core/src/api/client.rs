//! API client for the CRM REST service.
//!
//! Every request carries `Content-Type: application/json` and, when the
//! session holds one, `Authorization: Bearer <token>`. A `401` triggers at
//! most one token refresh through `POST /auth/refresh` followed by exactly
//! one retry of the original request. Concurrent `401`s share a single
//! refresh: whoever gets the gate second sees the token already replaced and
//! retries with it.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::config::Config;

use super::notify::{Notification, Notifier};
use super::{ApiError, ApiRequest};

/// Token refresh endpoint. Called without a bearer header.
const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// API client for the CRM service.
/// Clone is cheap - the connection pool, session and refresh gate are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    session: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
    refresh_gate: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        session: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(config.api_base()),
            session,
            notifier,
            refresh_gate: Arc::new(Mutex::new(())),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ===== Verbs =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_as(ApiRequest::get(path)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.reported(ApiRequest::post(path, body))?;
        self.send_as(request).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.reported(ApiRequest::put(path, body))?;
        self.send_as(request).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.reported(ApiRequest::patch(path, body))?;
        self.send_as(request).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_as(ApiRequest::delete(path)).await
    }

    // ===== Request execution =====

    /// Send a request and return the decoded JSON body. A `204` (or empty
    /// body) yields an empty object.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let result = self.execute(&request).await;
        self.reported(result)
    }

    /// Send a request and deserialize the body into `T`.
    pub async fn send_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let value = self.send(request).await?;
        self.reported(Self::decode(value))
    }

    /// `send_as` with cancellation, see `send_with_cancel`.
    pub async fn send_as_with_cancel<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        let value = self.send_with_cancel(request, cancel).await?;
        self.reported(Self::decode(value))
    }

    /// Deserialize a response body. The `{}` standing in for an empty
    /// response also satisfies unit-like targets such as `()`.
    fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
        let empty = value.as_object().is_some_and(Map::is_empty);
        match serde_json::from_value(value) {
            Ok(decoded) => Ok(decoded),
            Err(_) if empty => serde_json::from_value(Value::Null).map_err(ApiError::Decode),
            Err(e) => Err(ApiError::Decode(e)),
        }
    }

    /// Like `send`, but gives up with `ApiError::Cancelled` as soon as
    /// `cancel` fires, including mid-refresh.
    pub async fn send_with_cancel(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, ApiError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(path = %request.path, "Request cancelled");
                Err(ApiError::Cancelled)
            }
            result = self.execute(&request) => self.reported(result),
        }
    }

    /// Announce a failure to the user before handing it to the caller.
    /// Cancellation is caller-initiated and stays quiet.
    fn reported<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ref e) = result {
            if !matches!(e, ApiError::Cancelled) {
                self.notifier.notify(Notification::error(e.to_string()));
            }
        }
        result
    }

    async fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let token = self.session.access_token();
        let response = self.dispatch(request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::read_body(response).await;
        }

        debug!(method = %request.method, path = %request.path, "Access token rejected");
        let fresh = self.refresh_after_rejection(token.as_deref()).await?;

        // Exactly one retry. A second 401 means the fresh token is no good
        // either, so the session ends here instead of refreshing again.
        let retry = self.dispatch(request, Some(&fresh)).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            warn!(path = %request.path, "Request rejected again after token refresh");
            self.session.logout();
            return Err(ApiError::SessionExpired);
        }

        Self::read_body(retry).await
    }

    /// Obtain a usable access token after `rejected` got a 401.
    async fn refresh_after_rejection(&self, rejected: Option<&str>) -> Result<String, ApiError> {
        if self.session.refresh_token().is_none() {
            info!("No refresh token held, clearing session");
            self.session.logout();
            return Err(ApiError::AuthenticationRequired);
        }

        let _gate = self.refresh_gate.lock().await;

        // Someone else refreshed while we waited for the gate.
        if let Some(current) = self.session.access_token() {
            if rejected != Some(current.as_str()) {
                debug!("Reusing access token refreshed by a concurrent request");
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            // Cleared by a concurrent failure while we waited
            return Err(ApiError::SessionExpired);
        };

        match self.request_new_access_token(&refresh_token).await {
            Some(token) => {
                self.session.update_token(token.clone());
                // A logout while the refresh was in flight drops the token
                if self.session.access_token().as_deref() != Some(token.as_str()) {
                    warn!("Session ended during token refresh");
                    return Err(ApiError::SessionExpired);
                }
                info!("Access token refreshed");
                Ok(token)
            }
            None => {
                self.session.logout();
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Exchange the refresh token for a new access token. Any failure,
    /// including a response without `accessToken`, yields `None`.
    async fn request_new_access_token(&self, refresh_token: &str) -> Option<String> {
        let url = self.url(REFRESH_PATH);

        let response = match self
            .client
            .post(&url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Token refresh rejected");
            return None;
        }

        match response.json::<RefreshResponse>().await {
            Ok(body) => body.access_token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to parse token refresh response");
                None
            }
        }
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let url = self.url(&request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(Self::headers(token)?);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, path = %request.path, authenticated = token.is_some(), "Sending request");
        Ok(builder.send().await?)
    }

    fn headers(token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    async fn read_body(response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "Request failed");
            return Err(ApiError::from_response(status, &body));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Object(Map::new()));
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_slice(&bytes).map_err(ApiError::Decode)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LogNotifier;

    fn client_for(base: &str) -> ApiClient {
        let config = Config {
            api_base_url: base.to_string(),
            ..Config::default()
        };
        ApiClient::new(&config, Arc::new(SessionStore::in_memory()), Arc::new(LogNotifier))
            .expect("client should build")
    }

    #[test]
    fn test_headers_with_token() {
        let headers = ApiClient::headers(Some("abc")).unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_headers_without_token() {
        let headers = ApiClient::headers(None).unwrap();
        assert!(!headers.contains_key(header::AUTHORIZATION));
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_headers_reject_invalid_token() {
        assert!(matches!(
            ApiClient::headers(Some("bad\ntoken")),
            Err(ApiError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_empty_body_decodes_as_unit() {
        let empty = Value::Object(Map::new());
        assert!(ApiClient::decode::<()>(empty.clone()).is_ok());
        assert_eq!(ApiClient::decode::<Option<String>>(empty.clone()).unwrap(), None);
        assert_eq!(ApiClient::decode::<Value>(empty.clone()).unwrap(), empty);
    }

    #[test]
    fn test_non_empty_body_keeps_decode_error() {
        let body = serde_json::json!({"id": 1});
        assert!(matches!(ApiClient::decode::<()>(body), Err(ApiError::Decode(_))));
        assert!(matches!(
            ApiClient::decode::<String>(Value::Object(Map::new())),
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn test_url_joining() {
        let client = client_for("https://api.example.com/");
        assert_eq!(client.url("/customers"), "https://api.example.com/customers");
        assert_eq!(client.url("customers/1"), "https://api.example.com/customers/1");
    }
}
