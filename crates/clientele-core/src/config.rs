//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which holds the API base URL, OAuth client settings, and list page size.
//!
//! Configuration is stored at `~/.config/clientele/config.json`. Values can be
//! overridden with `CLIENTELE_*` environment variables (see `apply_env`).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data/cache directory paths
pub const APP_NAME: &str = "clientele";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "https://api.example.com";
const DEFAULT_OAUTH_AUTHORIZE_URL: &str = "https://auth.example.com/oauth/authorize";
const DEFAULT_OAUTH_CLIENT_ID: &str = "client_id";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:5173/login";

/// Rows per page on the customers list.
const DEFAULT_PAGE_SIZE: u32 = 10;

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "CLIENTELE_API_URL";
pub const ENV_OAUTH_URL: &str = "CLIENTELE_OAUTH_URL";
pub const ENV_OAUTH_CLIENT_ID: &str = "CLIENTELE_OAUTH_CLIENT_ID";
pub const ENV_REDIRECT_URI: &str = "CLIENTELE_REDIRECT_URI";

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_oauth_authorize_url() -> String {
    DEFAULT_OAUTH_AUTHORIZE_URL.to_string()
}

fn default_oauth_client_id() -> String {
    DEFAULT_OAUTH_CLIENT_ID.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_oauth_authorize_url")]
    pub oauth_authorize_url: String,
    #[serde(default = "default_oauth_client_id")]
    pub oauth_client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            oauth_authorize_url: default_oauth_authorize_url(),
            oauth_client_id: default_oauth_client_id(),
            redirect_uri: default_redirect_uri(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load from the config file (defaults if absent), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from environment-style lookups. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = get(ENV_OAUTH_URL) {
            self.oauth_authorize_url = url;
        }
        if let Some(id) = get(ENV_OAUTH_CLIENT_ID) {
            self.oauth_client_id = id;
        }
        if let Some(uri) = get(ENV_REDIRECT_URI) {
            self.redirect_uri = uri;
        }
    }

    /// Base URL without a trailing slash, ready for `format!("{}{}", base, path)`.
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for durable local state (session, pending OAuth state).
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
