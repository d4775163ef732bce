//! Navigation state and the top-level route guard.
//!
//! The current route lives in a `watch` channel so the shell can await changes;
//! the API layer uses the same handle to force `SignIn` on authorization failure.

use crate::models::SessionId;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SignIn,
    /// Session directory with no open thread.
    Home,
    Thread(SessionId),
}

/// Apply the auth guard: logged-out users only see `SignIn`, logged-in users never do.
pub fn guard(route: Route, logged_in: bool) -> Route {
    match (route, logged_in) {
        (_, false) => Route::SignIn,
        (Route::SignIn, true) => Route::Home,
        (r, true) => r,
    }
}

/// Cloneable handle to the current route.
#[derive(Debug, Clone)]
pub struct Navigator {
    tx: watch::Sender<Route>,
}

impl Navigator {
    pub fn new(initial: Route) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> Route {
        self.tx.borrow().clone()
    }

    pub fn navigate(&self, route: Route) {
        log::debug!("navigate: {:?}", route);
        self.tx.send_replace(route);
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.tx.subscribe()
    }
}
