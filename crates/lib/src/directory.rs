//! Session directory controller: list, create and select chat sessions.

use crate::api::{ApiError, SessionInput, SessionsApi};
use crate::identity::AuthContext;
use crate::models::Session;
use crate::notify::Notifier;
use crate::routing::{Navigator, Route};
use crate::session::SessionStore;
use std::sync::Arc;

/// Preview text of a session nobody has written to yet.
pub const NEW_SESSION_PREVIEW: &str = "Start Chatting...";

const CREATED_NOTICE: &str = "Chat created, start chatting !!!";

pub struct SessionDirectory {
    api: SessionsApi,
    store: SessionStore,
    auth: Arc<AuthContext>,
    notifier: Notifier,
}

impl SessionDirectory {
    pub fn new(
        api: SessionsApi,
        store: SessionStore,
        auth: Arc<AuthContext>,
        notifier: Notifier,
    ) -> Self {
        Self {
            api,
            store,
            auth,
            notifier,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn navigator(&self) -> &Navigator {
        self.auth.navigator()
    }

    /// Fetch every session and replace the store contents.
    pub async fn load(&self) -> Result<Vec<Session>, ApiError> {
        match self.api.list().await {
            Ok(sessions) => {
                log::debug!("loaded {} sessions", sessions.len());
                self.store.set_all(sessions.clone()).await;
                Ok(sessions)
            }
            Err(e) => {
                self.notifier.error(e.message.clone());
                Err(e)
            }
        }
    }

    /// Create a session with the placeholder preview, list it first and open its thread.
    pub async fn create(&self) -> Result<Session, ApiError> {
        let input = SessionInput {
            last_message: NEW_SESSION_PREVIEW.to_string(),
            user: None,
        };
        let created = match self.api.create(&input).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                log::warn!("create session returned no record");
                let e = ApiError::unexpected();
                self.notifier.error(e.message.clone());
                return Err(e);
            }
            Err(e) => {
                self.notifier.error(e.message.clone());
                return Err(e);
            }
        };
        self.store.add(created.clone()).await;
        self.notifier.success(CREATED_NOTICE);
        self.navigator()
            .navigate(Route::Thread(created.document_id.clone()));
        Ok(created)
    }

    /// Open a session's thread. Navigation only; the thread loads itself.
    pub fn select(&self, session_id: &str) {
        self.navigator()
            .navigate(Route::Thread(session_id.to_string()));
    }

    /// Change the preview text of a session.
    pub async fn rename(&self, session_id: &str, preview: &str) -> Result<Session, ApiError> {
        let input = SessionInput {
            last_message: preview.to_string(),
            user: None,
        };
        match self.api.update(session_id, &input).await {
            Ok(Some(s)) => {
                if !self.store.update(s.clone()).await {
                    log::debug!("renamed session {} was not listed", session_id);
                }
                Ok(s)
            }
            Ok(None) => {
                let e = ApiError::unexpected();
                self.notifier.error(e.message.clone());
                Err(e)
            }
            Err(e) => {
                self.notifier.error(e.message.clone());
                Err(e)
            }
        }
    }

    /// Delete a session; leaves its thread if it was open.
    pub async fn delete(&self, session_id: &str) -> Result<(), ApiError> {
        if let Err(e) = self.api.delete(session_id).await {
            self.notifier.error(e.message.clone());
            return Err(e);
        }
        self.store.remove(session_id).await;
        if self.navigator().current() == Route::Thread(session_id.to_string()) {
            self.navigator().navigate(Route::Home);
        }
        Ok(())
    }
}
