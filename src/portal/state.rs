//! Reactive session state. Holds only the signed-in user; tokens stay with the
//! [`AuthClient`](super::AuthClient).

use super::AuthSession;
use crate::identity::Identity;
use std::sync::Arc;
use tokio::sync::watch;

/// Auth state changes emitted by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    SignedOut,
    TokenRefreshed(AuthSession),
    UserUpdated(AuthSession),
}

impl AuthEvent {
    #[must_use]
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::SignedIn(session)
            | Self::TokenRefreshed(session)
            | Self::UserUpdated(session) => Some(session),
            Self::SignedOut => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthState {
    user: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    #[must_use]
    pub fn new() -> Self {
        let (user, _) = watch::channel(None);
        Self {
            user: Arc::new(user),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.user.borrow().clone()
    }

    /// Watch the user; the receiver sees every change made after this call.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.user.subscribe()
    }

    pub fn set_user(&self, user: Option<Identity>) {
        self.user.send_replace(user);
    }

    pub fn clear(&self) {
        self.set_user(None);
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    /// Mirror an auth event: the event's user, or nobody.
    pub fn apply(&self, event: &AuthEvent) {
        self.set_user(event.session().map(|session| session.user.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            user: Identity {
                id: "1".to_string(),
                email: "asha@example.com".to_string(),
                name: Some("Asha".to_string()),
                username: Some("asha".to_string()),
            },
        }
    }

    #[test]
    fn starts_signed_out() {
        let state = AuthState::new();
        assert!(state.current().is_none());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn apply_mirrors_events() {
        let state = AuthState::new();
        state.apply(&AuthEvent::SignedIn(session()));
        assert_eq!(
            state.current().map(|user| user.email),
            Some("asha@example.com".to_string())
        );
        state.apply(&AuthEvent::TokenRefreshed(session()));
        assert!(state.is_authenticated());
        state.apply(&AuthEvent::SignedOut);
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let state = AuthState::new();
        let mut receiver = state.subscribe();
        let clone = state.clone();
        clone.set_user(Some(session().user));

        assert!(receiver.changed().await.is_ok());
        assert!(receiver.borrow_and_update().is_some());

        state.clear();
        assert!(receiver.changed().await.is_ok());
        assert!(receiver.borrow().is_none());
    }
}
