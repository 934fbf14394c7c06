//! OAuth2 authorization-code helpers.
//!
//! The authorization server itself is external; this module only builds the
//! authorization URL, generates and remembers the CSRF state nonce, and
//! parses the redirect the server sends the user back to.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Scopes requested from the authorization server
pub const OAUTH_SCOPE: &str = "openid profile email";

/// Length of the generated state nonce
const STATE_LENGTH: usize = 24;

const STATE_FILE: &str = "oauth-state.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OAuthError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Authentication error: {0}")]
    Provider(String),

    #[error("Authorization response is missing the {0} parameter")]
    MissingParameter(&'static str),

    #[error("No login is in progress. Please start again.")]
    NoPendingState,

    #[error("Login state did not match. Please start again.")]
    StateMismatch,
}

#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub authorize_url: String,
    pub client_id: String,
    pub redirect_uri: String,
}

impl OAuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            authorize_url: config.oauth_authorize_url.clone(),
            client_id: config.oauth_client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    /// Build the URL the user opens to sign in.
    pub fn authorization_url(&self, state: &str) -> Result<Url, OAuthError> {
        Url::parse_with_params(
            &self.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
                ("scope", OAUTH_SCOPE),
            ],
        )
        .map_err(|e| OAuthError::InvalidUrl(format!("{}: {}", self.authorize_url, e)))
    }
}

/// Random alphanumeric CSRF nonce for the `state` parameter.
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct PendingState {
    state: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// Remembers the state nonce between sending the user to the authorization
/// server and receiving the redirect.
#[derive(Debug, Clone)]
pub struct OAuthStateStore {
    path: PathBuf,
}

impl OAuthStateStore {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(STATE_FILE),
        }
    }

    pub fn save(&self, state: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pending = PendingState {
            state: state.to_string(),
            created_at: chrono::Utc::now(),
        };
        std::fs::write(&self.path, serde_json::to_string(&pending)?)
            .context("Failed to save OAuth state")?;
        Ok(())
    }

    /// Read and remove the pending nonce. Each nonce is usable once.
    pub fn take(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read OAuth state")?;
        std::fs::remove_file(&self.path).context("Failed to remove OAuth state")?;
        let pending: PendingState = serde_json::from_str(&contents)
            .context("Failed to parse OAuth state")?;
        debug!(created_at = %pending.created_at, "Consumed pending OAuth state");
        Ok(Some(pending.state))
    }
}

/// The query parameters of the redirect back from the authorization server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCallback {
    pub code: String,
    pub state: String,
}

impl AuthorizationCallback {
    /// Parse a pasted redirect URL such as
    /// `http://localhost:5173/login?code=abc&state=xyz`.
    pub fn parse(redirect: &str) -> Result<Self, OAuthError> {
        let url = Url::parse(redirect.trim())
            .map_err(|e| OAuthError::InvalidUrl(e.to_string()))?;

        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut error_description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            let message = match error_description {
                Some(description) => format!("{} ({})", error, description),
                None => error,
            };
            return Err(OAuthError::Provider(message));
        }

        Ok(Self {
            code: code.filter(|c| !c.is_empty()).ok_or(OAuthError::MissingParameter("code"))?,
            state: state.filter(|s| !s.is_empty()).ok_or(OAuthError::MissingParameter("state"))?,
        })
    }

    /// Check the returned state against the nonce saved before redirecting.
    pub fn verify_state(&self, expected: Option<&str>) -> Result<(), OAuthError> {
        match expected {
            None => Err(OAuthError::NoPendingState),
            Some(expected) if expected == self.state => Ok(()),
            Some(_) => Err(OAuthError::StateMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OAuthSettings {
        OAuthSettings {
            authorize_url: "https://auth.example.com/oauth/authorize".to_string(),
            client_id: "dashboard".to_string(),
            redirect_uri: "http://localhost:5173/login".to_string(),
        }
    }

    #[test]
    fn test_authorization_url_params() {
        let url = settings().authorization_url("nonce123").unwrap();
        let params: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/oauth/authorize");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "dashboard");
        assert_eq!(params["redirect_uri"], "http://localhost:5173/login");
        assert_eq!(params["state"], "nonce123");
        assert_eq!(params["scope"], "openid profile email");
    }

    #[test]
    fn test_authorization_url_rejects_bad_base() {
        let mut bad = settings();
        bad.authorize_url = "not a url".to_string();
        assert!(matches!(bad.authorization_url("s"), Err(OAuthError::InvalidUrl(_))));
    }

    #[test]
    fn test_generate_state() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), STATE_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_callback() {
        let cb = AuthorizationCallback::parse("http://localhost:5173/login?code=abc&state=xyz").unwrap();
        assert_eq!(cb.code, "abc");
        assert_eq!(cb.state, "xyz");
    }

    #[test]
    fn test_parse_callback_errors() {
        assert_eq!(
            AuthorizationCallback::parse("http://localhost/login?error=access_denied&error_description=User+cancelled"),
            Err(OAuthError::Provider("access_denied (User cancelled)".to_string()))
        );
        assert_eq!(
            AuthorizationCallback::parse("http://localhost/login?state=xyz"),
            Err(OAuthError::MissingParameter("code"))
        );
        assert_eq!(
            AuthorizationCallback::parse("http://localhost/login?code=abc"),
            Err(OAuthError::MissingParameter("state"))
        );
        assert!(matches!(
            AuthorizationCallback::parse("abc"),
            Err(OAuthError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_verify_state() {
        let cb = AuthorizationCallback {
            code: "abc".to_string(),
            state: "xyz".to_string(),
        };
        assert_eq!(cb.verify_state(Some("xyz")), Ok(()));
        assert_eq!(cb.verify_state(Some("other")), Err(OAuthError::StateMismatch));
        assert_eq!(cb.verify_state(None), Err(OAuthError::NoPendingState));
    }

    #[test]
    fn test_state_store_take_is_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let store = OAuthStateStore::in_dir(dir.path());
        assert_eq!(store.take().unwrap(), None);

        store.save("nonce").unwrap();
        assert_eq!(store.take().unwrap().as_deref(), Some("nonce"));
        assert_eq!(store.take().unwrap(), None);
    }
}
