//! Authentication state and OAuth helpers.
//!
//! This module provides:
//! - `SessionStore`: process-wide session (tokens and user), persisted to
//!   `auth-storage.json`
//! - `oauth`: authorization URL construction, CSRF state nonce handling, and
//!   redirect parsing for the authorization-code flow

pub mod oauth;
pub mod session;

pub use oauth::{AuthorizationCallback, OAuthError, OAuthSettings, OAuthStateStore};
pub use session::{SessionState, SessionStorage, SessionStore, UserIdentity, UserUpdate};
