use std::sync::Arc;

use shared::domain::User;
use storage::{load_json, save_json, LocalStore};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

/// Durable storage key holding the JSON-serialized logged-in user.
pub const USER_STORAGE_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Login(User),
    Logout,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    pub fn apply(self, action: SessionAction) -> Self {
        match action {
            SessionAction::Login(user) => Self { user: Some(user) },
            SessionAction::Logout => Self { user: None },
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(User),
    LoggedOut,
}

/// Holds the current [`Session`] and mirrors it into durable storage.
///
/// The store only applies already-validated users; persistence failures are
/// logged and never undo a transition.
pub struct SessionStore {
    state: Mutex<Session>,
    storage: Arc<dyn LocalStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn LocalStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(Session::default()),
            storage,
            events,
        }
    }

    pub async fn login(&self, user: User) {
        self.dispatch(SessionAction::Login(user)).await;
    }

    pub async fn logout(&self) {
        self.dispatch(SessionAction::Logout).await;
    }

    pub async fn dispatch(&self, action: SessionAction) {
        // held across persistence so storage writes land in dispatch order
        let mut state = self.state.lock().await;
        self.persist(&action).await;
        self.apply_locked(&mut state, action);
    }

    /// Restores a previously saved user without writing it back.
    ///
    /// Returns whether the store ended up logged in.
    pub async fn rehydrate(&self) -> bool {
        let mut state = self.state.lock().await;
        match load_json::<User>(self.storage.as_ref(), USER_STORAGE_KEY).await {
            Ok(Some(user)) => {
                info!(username = %user.username, "session: restored from local storage");
                self.apply_locked(&mut state, SessionAction::Login(user));
            }
            Ok(None) => {}
            Err(err) => warn!("session: ignoring unreadable stored user: {err:#}"),
        }
        state.is_logged_in()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.lock().await.is_logged_in()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.lock().await.user().cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn apply_locked(&self, state: &mut Session, action: SessionAction) {
        let event = match &action {
            SessionAction::Login(user) => SessionEvent::LoggedIn(user.clone()),
            SessionAction::Logout => SessionEvent::LoggedOut,
        };
        *state = std::mem::take(state).apply(action);
        let _ = self.events.send(event);
    }

    async fn persist(&self, action: &SessionAction) {
        let (label, result) = match action {
            SessionAction::Login(user) => (
                "login",
                save_json(self.storage.as_ref(), USER_STORAGE_KEY, user).await,
            ),
            SessionAction::Logout => ("logout", self.storage.remove(USER_STORAGE_KEY).await),
        };
        if let Err(err) = result {
            warn!("session: failed to persist {label}: {err:#}");
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
