//! Identity store and the auth context that owns credential persistence.
//!
//! `AuthContext` is the only writer of the bearer token and the identity snapshot.
//! It is created once per process and passed (as `Arc`) to every component that
//! needs the token or the logged-in state.

use crate::models::UserInfo;
use crate::routing::{Navigator, Route};
use crate::storage::{LocalStorage, StorageError, TOKEN_KEY, USER_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Durable identity snapshot. Never contains the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySnapshot {
    pub username: String,
    pub email: String,
    pub user_id: String,
}

impl From<&UserInfo> for IdentitySnapshot {
    fn from(u: &UserInfo) -> Self {
        Self {
            username: u.username.clone(),
            email: u.email.clone(),
            user_id: u.document_id.clone(),
        }
    }
}

/// In-memory authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityState {
    pub logged_in: bool,
    pub username: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
}

impl From<IdentitySnapshot> for IdentityState {
    fn from(s: IdentitySnapshot) -> Self {
        Self {
            logged_in: true,
            username: Some(s.username),
            email: Some(s.email),
            user_id: Some(s.user_id),
        }
    }
}

/// Identity store: memory state mirrored to the `user` snapshot key.
pub struct IdentityStore {
    storage: Arc<dyn LocalStorage>,
    state: RwLock<IdentityState>,
}

impl IdentityStore {
    /// Hydrate from the persisted snapshot. A present snapshot means logged in; the token is not re-validated here.
    pub fn hydrate(storage: Arc<dyn LocalStorage>) -> Self {
        let state = storage
            .get(USER_KEY)
            .and_then(|s| match serde_json::from_str::<IdentitySnapshot>(&s) {
                Ok(snap) => Some(snap),
                Err(e) => {
                    log::warn!("ignoring unreadable identity snapshot: {}", e);
                    None
                }
            })
            .map(IdentityState::from)
            .unwrap_or_default();
        Self {
            storage,
            state: RwLock::new(state),
        }
    }

    pub async fn state(&self) -> IdentityState {
        self.state.read().await.clone()
    }

    pub async fn login(&self, snapshot: IdentitySnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string(&snapshot).map_err(|source| StorageError::Corrupt {
            path: USER_KEY.into(),
            source,
        })?;
        self.storage.set(USER_KEY, &json)?;
        *self.state.write().await = IdentityState::from(snapshot);
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), StorageError> {
        *self.state.write().await = IdentityState::default();
        self.storage.remove(USER_KEY)
    }
}

/// Credential and identity owner shared by the API clients, channel and views.
pub struct AuthContext {
    storage: Arc<dyn LocalStorage>,
    identity: IdentityStore,
    navigator: Navigator,
}

impl AuthContext {
    pub fn new(storage: Arc<dyn LocalStorage>, navigator: Navigator) -> Self {
        let identity = IdentityStore::hydrate(storage.clone());
        Self {
            storage,
            identity,
            navigator,
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Cached bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.storage.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub async fn state(&self) -> IdentityState {
        self.identity.state().await
    }

    pub async fn is_logged_in(&self) -> bool {
        self.identity.state().await.logged_in
    }

    /// Record a successful sign-in: bearer token plus identity snapshot.
    /// Memory state flips to logged in only once both are persisted.
    pub async fn login(&self, user: &UserInfo, token: &str) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token)?;
        if let Err(e) = self.identity.login(IdentitySnapshot::from(user)).await {
            if let Err(undo) = self.storage.remove(TOKEN_KEY) {
                log::warn!("removing token after failed sign-in: {}", undo);
            }
            return Err(e);
        }
        log::info!("signed in as {}", user.username);
        Ok(())
    }

    /// Clear token, identity state and snapshot.
    pub async fn logout(&self) -> Result<(), StorageError> {
        let token_res = self.storage.remove(TOKEN_KEY);
        self.identity.logout().await?;
        token_res
    }

    /// 401 policy: forget credentials and force the sign-in route. Storage failures are logged, never returned.
    pub async fn handle_unauthorized(&self) {
        log::warn!("authorization rejected, signing out");
        if let Err(e) = self.logout().await {
            log::warn!("clearing credentials failed: {}", e);
        }
        self.navigator.navigate(Route::SignIn);
    }
}
