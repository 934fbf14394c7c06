//! Session store: the single source of truth for "are we logged in, and
//! with what credentials".
//!
//! The store is an explicitly owned object shared through `Arc`; the API
//! client reads tokens from it and asks it to update or clear them. Every
//! mutation is written to `auth-storage.json` so a restart restores the
//! session without logging in again.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage key for the persisted session; also the file stem on disk.
pub const AUTH_STORAGE_KEY: &str = "auth-storage";

/// Version written into the persisted envelope.
const STORAGE_VERSION: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Fields to merge into the current user. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub is_authenticated: bool,
    pub user: Option<UserIdentity>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionState {
    /// Restore the invariant after loading from disk: authenticated exactly
    /// when both an access token and a user are held. Anything less is
    /// dropped entirely.
    fn normalized(self) -> Self {
        if self.access_token.is_some() && self.user.is_some() {
            Self {
                is_authenticated: true,
                ..self
            }
        } else {
            Self::default()
        }
    }
}

/// On-disk envelope: `{"state": {...}, "version": 0}`
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    state: SessionState,
    #[serde(default)]
    version: u32,
}

/// JSON file backing for the session store.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<dir>/auth-storage.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{}.json", AUTH_STORAGE_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<SessionState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;
        let persisted: PersistedSession = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;
        Ok(Some(persisted.state.normalized()))
    }

    pub fn save(&self, state: &SessionState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let envelope = PersistedSession {
            state: state.clone(),
            version: STORAGE_VERSION,
        };
        let contents = serde_json::to_string_pretty(&envelope)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SessionStore {
    state: RwLock<SessionState>,
    storage: Option<SessionStorage>,
}

impl SessionStore {
    /// A store that lives only in memory. Used by tests and one-shot tools.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            storage: None,
        }
    }

    /// Open a persisted store, restoring any saved session.
    /// An unreadable file starts an empty session rather than failing.
    pub fn open(storage: SessionStorage) -> Self {
        let state = match storage.load() {
            Ok(Some(state)) => {
                debug!(authenticated = state.is_authenticated, "Restored session");
                state
            }
            Ok(None) => SessionState::default(),
            Err(e) => {
                warn!(error = %e, path = %storage.path().display(), "Ignoring unreadable session file");
                SessionState::default()
            }
        };
        Self {
            state: RwLock::new(state),
            storage: Some(storage),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist while the write guard is still held so saves land in
    /// mutation order.
    fn persist(&self, state: &SessionState) {
        if let Some(ref storage) = self.storage {
            if let Err(e) = storage.save(state) {
                warn!(error = %e, "Failed to persist session");
            }
        }
    }

    /// Replace the whole session with a freshly authenticated one.
    pub fn login(&self, access_token: String, refresh_token: String, user: UserIdentity) {
        let mut state = self.write();
        *state = SessionState {
            is_authenticated: true,
            user: Some(user),
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
        };
        self.persist(&state);
        debug!("Session logged in");
    }

    /// Clear every field. Calling it on an empty session is harmless.
    pub fn logout(&self) {
        let mut state = self.write();
        *state = SessionState::default();
        self.persist(&state);
        debug!("Session cleared");
    }

    /// Swap in a refreshed access token, leaving everything else alone.
    /// Ignored when no session is active.
    pub fn update_token(&self, access_token: String) {
        let mut state = self.write();
        if !state.is_authenticated {
            debug!("Ignoring token update for unauthenticated session");
            return;
        }
        state.access_token = Some(access_token);
        self.persist(&state);
    }

    /// Merge the given fields into the current user; no-op without one.
    pub fn update_user(&self, update: UserUpdate) {
        let mut state = self.write();
        let Some(user) = state.user.as_mut() else {
            return;
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(avatar) = update.avatar {
            user.avatar = Some(avatar);
        }
        self.persist(&state);
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }
}
