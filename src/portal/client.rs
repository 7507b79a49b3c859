//! Portal-side auth client and the [`Auth`] composable built on it.
//!
//! [`AuthClient`] talks to the service's `/api/v1/auth` endpoints and keeps
//! the token pair in memory. Every sign-in, sign-out and refresh is broadcast
//! as an [`AuthEvent`]. [`Auth`] wires those events into a single reactive
//! [`AuthState`]. There is no retry or caching: a failed call is logged and
//! the state falls back to signed out.

use super::{
    guard::SessionSource,
    state::{AuthEvent, AuthState},
};
use crate::{identity::Identity, APP_USER_AGENT};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::{
    sync::{broadcast, RwLock},
    task::JoinHandle,
};
use tracing::{debug, error, warn};
use url::Url;

pub const AUTH_PREFIX: &str = "/api/v1/auth";
const EVENT_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Identity,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request failed ({status}): {detail}")]
    Api { status: u16, detail: String },
    #[error("no active session")]
    NoSession,
}

impl ClientError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            Self::Url(_) | Self::NoSession => None,
        }
    }
}

#[derive(Deserialize)]
struct TokenPayload {
    access_token: String,
    refresh_token: String,
    user: Identity,
}

impl From<TokenPayload> for AuthSession {
    fn from(payload: TokenPayload) -> Self {
        Self {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            user: payload.user,
        }
    }
}

#[derive(Clone)]
pub struct AuthClient {
    base: String,
    http: Client,
    session: Arc<RwLock<Option<AuthSession>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    /// Build a client for the API at `api_url` (e.g. `http://localhost:8000`).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(api_url: &str) -> Result<Self, ClientError> {
        let url = Url::parse(api_url)?;
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            base: format!("{}{AUTH_PREFIX}", url.as_str().trim_end_matches('/')),
            http,
            session: Arc::new(RwLock::new(None)),
            events,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn emit(&self, event: AuthEvent) {
        if self.events.send(event).is_err() {
            debug!("no auth state listeners");
        }
    }

    async fn store(&self, session: Option<AuthSession>) {
        *self.session.write().await = session;
    }

    /// The locally held session, without asking the server.
    pub async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    /// Subscribe to auth state changes.
    #[must_use]
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// # Errors
    /// Returns [`ClientError::Api`] with status 401 on bad credentials.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ClientError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session = AuthSession::from(read_json::<TokenPayload>(response).await?);

        self.store(Some(session.clone())).await;
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Drop the local session and revoke it server-side. The local session is
    /// gone even if the server call fails.
    ///
    /// # Errors
    /// Returns an error if the logout request fails.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let session = self.session.write().await.take();
        self.emit(AuthEvent::SignedOut);

        let Some(session) = session else {
            return Ok(());
        };
        let response = self
            .http
            .post(self.url("/logout"))
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        read_json::<Value>(response).await.map(|_| ())
    }

    /// Validate the local session against the server. `Ok(None)` when there is
    /// no session or the server no longer accepts it.
    ///
    /// # Errors
    /// Returns an error on network failures or unexpected responses.
    pub async fn get_session(&self) -> Result<Option<AuthSession>, ClientError> {
        let Some(current) = self.session().await else {
            return Ok(None);
        };

        let response = self
            .http
            .get(self.url("/session"))
            .bearer_auth(&current.access_token)
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            let cleared = {
                let mut stored = self.session.write().await;
                let same = stored
                    .as_ref()
                    .is_some_and(|session| session.access_token == current.access_token);
                if same {
                    *stored = None;
                }
                same
            };
            if cleared {
                self.emit(AuthEvent::SignedOut);
            }
            return Ok(None);
        }

        let user = read_json::<Identity>(response).await?;
        let changed = user != current.user;
        let session = AuthSession { user, ..current };
        if changed {
            {
                let mut stored = self.session.write().await;
                if let Some(held) = stored
                    .as_mut()
                    .filter(|held| held.access_token == session.access_token)
                {
                    held.user = session.user.clone();
                }
            }
            self.emit(AuthEvent::UserUpdated(session.clone()));
        }
        Ok(Some(session))
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// # Errors
    /// Returns [`ClientError::NoSession`] when signed out.
    pub async fn refresh_session(&self) -> Result<AuthSession, ClientError> {
        let refresh_token = self
            .session()
            .await
            .map(|session| session.refresh_token)
            .ok_or(ClientError::NoSession)?;

        let response = self
            .http
            .post(self.url("/refresh"))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let session = AuthSession::from(read_json::<TokenPayload>(response).await?);

        self.store(Some(session.clone())).await;
        self.emit(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl SessionSource for AuthClient {
    async fn get_session(&self) -> Result<Option<AuthSession>, ClientError> {
        AuthClient::get_session(self).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let detail = body["detail"]
        .as_str()
        .map_or_else(|| status.to_string(), str::to_string);
    Err(ClientError::Api {
        status: status.as_u16(),
        detail,
    })
}

/// Reactive auth for the portal: one user variable, hydrated once and kept in
/// sync with client events.
pub struct Auth {
    client: AuthClient,
    state: AuthState,
    listener: JoinHandle<()>,
}

impl Auth {
    /// Fetch the session once and start mirroring auth events. A failed fetch
    /// is logged and leaves the user signed out.
    pub async fn bootstrap(client: AuthClient) -> Self {
        let state = AuthState::new();
        let mut events = client.on_auth_state_change();

        match client.get_session().await {
            Ok(session) => state.set_user(session.map(|session| session.user)),
            Err(err) => {
                error!("failed to fetch session: {err}");
                state.clear();
            }
        }

        let mirror = state.clone();
        let listener = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => mirror.apply(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("auth listener lagged, skipped {skipped} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self {
            client,
            state,
            listener,
        }
    }

    #[must_use]
    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    #[must_use]
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    #[must_use]
    pub fn user(&self) -> Option<Identity> {
        self.state.current()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// # Errors
    /// Returns the client error; the state is left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, ClientError> {
        let session = self.client.sign_in_with_password(email, password).await?;
        self.state.set_user(Some(session.user.clone()));
        Ok(session.user)
    }

    /// Sign out. The user is cleared whatever the server says.
    ///
    /// # Errors
    /// Returns the sign-out error after clearing the user.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.client.sign_out().await;
        self.state.clear();
        if let Err(err) = &result {
            error!("sign-out failed: {err}");
        }
        result
    }
}

impl Drop for Auth {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_includes_auth_prefix() {
        let client = AuthClient::new("http://localhost:8000/");
        assert!(client.is_ok());
        if let Ok(client) = client {
            assert_eq!(client.url("/login"), "http://localhost:8000/api/v1/auth/login");
        }
    }

    #[test]
    fn invalid_api_url() {
        assert!(matches!(AuthClient::new("localhost"), Err(ClientError::Url(_))));
    }

    #[tokio::test]
    async fn signed_out_client_has_no_session() {
        let client = AuthClient::new("http://127.0.0.1:9").ok();
        assert!(client.is_some());
        if let Some(client) = client {
            assert!(matches!(client.get_session().await, Ok(None)));
            assert!(matches!(
                client.refresh_session().await,
                Err(ClientError::NoSession)
            ));
            assert!(client.sign_out().await.is_ok());
        }
    }

    #[tokio::test]
    async fn bootstrap_without_session_is_signed_out() {
        let client = AuthClient::new("http://127.0.0.1:9").ok();
        assert!(client.is_some());
        if let Some(client) = client {
            let auth = Auth::bootstrap(client).await;
            assert!(!auth.is_authenticated());
            assert!(auth.user().is_none());
        }
    }

    #[tokio::test]
    async fn login_failure_leaves_state_untouched() {
        // Nothing listens on the discard port, so the request fails to connect.
        let client = AuthClient::new("http://127.0.0.1:9").ok();
        assert!(client.is_some());
        if let Some(client) = client {
            let auth = Auth::bootstrap(client).await;
            let result = auth.login("asha@example.com", "secret-pass").await;
            assert!(matches!(result, Err(ClientError::Http(_))));
            assert!(!auth.is_authenticated());
        }
    }

    #[test]
    fn api_error_status() {
        let err = ClientError::Api {
            status: 401,
            detail: "Incorrect email or password".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(
            err.to_string(),
            "request failed (401): Incorrect email or password"
        );
        assert_eq!(ClientError::NoSession.status(), None);
    }
}
