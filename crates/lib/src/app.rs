//! Application context: wires config, storage, auth, clients and controllers together.
//!
//! One `App` per process. Every controller it hands out shares the same
//! `AuthContext`, navigator, notifier and session store.

use crate::api::{ApiClient, MessagesApi, SessionsApi, UsersApi};
use crate::auth::AuthFlow;
use crate::config::{self, Config};
use crate::directory::SessionDirectory;
use crate::identity::AuthContext;
use crate::notify::{Notice, Notifier};
use crate::routing::{self, Navigator, Route};
use crate::session::SessionStore;
use crate::storage::{FileStorage, LocalStorage};
use crate::thread::ThreadView;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct App {
    config: Config,
    auth: Arc<AuthContext>,
    notifier: Notifier,
    sessions: SessionStore,
    public: ApiClient,
    private: ApiClient,
}

impl App {
    /// Build the context over `storage`. The initial route is the guarded `Home`.
    pub async fn new(
        config: Config,
        storage: Arc<dyn LocalStorage>,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<Notice>)> {
        let navigator = Navigator::new(Route::SignIn);
        let auth = Arc::new(AuthContext::new(storage, navigator));
        let start = routing::guard(Route::Home, auth.is_logged_in().await);
        auth.navigator().navigate(start);

        let public = ApiClient::public(&config, auth.clone())?;
        let private = ApiClient::private(&config, auth.clone())?;
        let (notifier, notices) = Notifier::channel();
        log::debug!("api base {}", public.base_url());
        Ok((
            Self {
                config,
                auth,
                notifier,
                sessions: SessionStore::new(),
                public,
                private,
            },
            notices,
        ))
    }

    /// Build the context with file storage at the configured state path.
    pub async fn from_config(
        config: Config,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<Notice>)> {
        let path = config::resolve_state_path(&config);
        log::debug!("local state at {}", path.display());
        Self::new(config, Arc::new(FileStorage::new(path))).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    pub fn navigator(&self) -> &Navigator {
        self.auth.navigator()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Current route after the auth guard.
    pub async fn guarded_route(&self) -> Route {
        routing::guard(self.navigator().current(), self.auth.is_logged_in().await)
    }

    pub fn users_api(&self) -> UsersApi {
        UsersApi::new(self.public.clone(), self.private.clone())
    }

    pub fn sessions_api(&self) -> SessionsApi {
        SessionsApi::new(self.private.clone())
    }

    pub fn messages_api(&self) -> MessagesApi {
        MessagesApi::new(self.private.clone())
    }

    pub fn auth_flow(&self) -> AuthFlow {
        AuthFlow::new(self.users_api(), self.auth.clone(), self.notifier.clone())
    }

    pub fn directory(&self) -> SessionDirectory {
        SessionDirectory::new(
            self.sessions_api(),
            self.sessions.clone(),
            self.auth.clone(),
            self.notifier.clone(),
        )
    }

    pub fn thread(&self) -> ThreadView {
        ThreadView::new(
            self.messages_api(),
            self.auth.clone(),
            self.notifier.clone(),
            config::resolve_realtime_url(&self.config),
            self.config.thread.page_size,
        )
    }
}
