//! Authentication endpoints and the login/logout flow.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::oauth::{generate_state, AuthorizationCallback, OAuthError, OAuthSettings, OAuthStateStore};
use crate::auth::UserIdentity;

const TOKEN_PATH: &str = "/auth/oauth/token";
const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Error, Debug)]
pub enum LoginError {
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to access login state: {0}")]
    Storage(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenExchangeRequest<'a> {
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserIdentity,
}

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    oauth: OAuthSettings,
    state_store: OAuthStateStore,
}

impl AuthService {
    pub fn new(api: ApiClient, oauth: OAuthSettings, state_store: OAuthStateStore) -> Self {
        Self {
            api,
            oauth,
            state_store,
        }
    }

    pub fn oauth(&self) -> &OAuthSettings {
        &self.oauth
    }

    /// Start a login: remember a fresh state nonce and return the URL the
    /// user should open.
    pub fn begin_login(&self) -> Result<Url, LoginError> {
        let state = generate_state();
        self.state_store
            .save(&state)
            .map_err(|e| LoginError::Storage(e.to_string()))?;
        Ok(self.oauth.authorization_url(&state)?)
    }

    /// Finish a login from the redirect URL the authorization server sent
    /// the user to. The state nonce is consumed whether or not it matches.
    pub async fn complete_login(&self, redirect: &str) -> Result<UserIdentity, LoginError> {
        let callback = AuthorizationCallback::parse(redirect)?;
        let expected = self
            .state_store
            .take()
            .map_err(|e| LoginError::Storage(e.to_string()))?;
        callback.verify_state(expected.as_deref())?;

        let auth = self
            .exchange_code_for_token(&callback.code, &self.oauth.redirect_uri)
            .await?;

        self.api
            .session()
            .login(auth.access_token, auth.refresh_token, auth.user.clone());
        info!(user_id = %auth.user.id, "Login successful");
        Ok(auth.user)
    }

    /// Exchange an authorization code for tokens and the user profile.
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthResponse, ApiError> {
        self.api
            .post(TOKEN_PATH, &TokenExchangeRequest { code, redirect_uri })
            .await
    }

    /// Tell the server we are leaving, then clear the local session no
    /// matter how that went.
    pub async fn logout(&self) {
        if let Err(e) = self.api.post::<Value, _>(LOGOUT_PATH, &serde_json::json!({})).await {
            warn!(error = %e, "Server-side logout failed");
        }
        self.api.session().logout();
        info!("Logged out");
    }
}
