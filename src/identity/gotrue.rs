//! Hosted identity provider speaking the GoTrue REST protocol.

use super::{normalize_email, AuthError, Identity, IdentityProvider, Session, SignUp};
use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, error, instrument};
use url::Url;

#[derive(Clone)]
pub struct GoTrueProvider {
    base_url: String,
    api_key: SecretString,
    client: Client,
}

impl std::fmt::Debug for GoTrueProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoTrueProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Validate and normalize the auth base URL (e.g. `https://<project>.supabase.co/auth/v1`).
///
/// # Errors
/// Returns an error if the URL cannot be parsed or is not http(s).
pub fn base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid auth URL: {raw}"))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(anyhow!("unsupported auth URL scheme: {scheme}")),
    }
    if url.host().is_none() {
        return Err(anyhow!("auth URL has no host"));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

impl GoTrueProvider {
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(auth_url: &str, api_key: SecretString) -> Result<Self> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;
        Ok(Self {
            base_url: base_url(auth_url)?,
            api_key,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.endpoint(path))
            .header("apikey", self.api_key.expose_secret())
    }

    fn with_bearer(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request.bearer_auth(access_token)
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
        let response = self
            .post(&format!("/token?grant_type={grant_type}"))
            .json(&body)
            .send()
            .await
            .context("auth provider unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            debug!(%status, grant_type, "token grant refused: {message}");
            return Err(match (status, grant_type) {
                (StatusCode::BAD_REQUEST, "password") => AuthError::InvalidCredentials,
                (StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED, _) => AuthError::InvalidToken,
                _ => provider_failure(status, &message),
            });
        }

        let body: Value = response
            .json()
            .await
            .context("invalid token response from auth provider")?;
        session_from_value(&body).ok_or_else(|| anyhow!("token response missing session").into())
    }
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn sign_up(&self, request: &SignUp) -> Result<Session, AuthError> {
        let body = json!({
            "email": normalize_email(&request.email),
            "password": request.password.expose_secret(),
            "data": {
                "name": request.name.trim(),
                "username": request.username.trim(),
            },
        });

        let response = self
            .post("/signup")
            .json(&body)
            .send()
            .await
            .context("auth provider unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            if message.to_lowercase().contains("already registered")
                || message.to_lowercase().contains("already exists")
            {
                return Err(AuthError::AlreadyRegistered);
            }
            if status.is_client_error() {
                return Err(AuthError::Rejected(message));
            }
            return Err(provider_failure(status, &message));
        }

        let body: Value = response
            .json()
            .await
            .context("invalid sign-up response from auth provider")?;

        // With email confirmation enabled the provider returns a bare user.
        session_from_value(&body).ok_or(AuthError::ConfirmationRequired)
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        self.token_grant(
            "password",
            json!({
                "email": normalize_email(email),
                "password": password.expose_secret(),
            }),
        )
        .await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[instrument(skip(self))]
    async fn recover(&self, email: &str) -> Result<(), AuthError> {
        let response = self
            .post("/recover")
            .json(&json!({ "email": normalize_email(email) }))
            .send()
            .await
            .context("auth provider unreachable")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = error_message(response).await;
        Err(provider_failure(status, &message))
    }

    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<Identity, AuthError> {
        let request = self
            .client
            .get(self.endpoint("/user"))
            .header("apikey", self.api_key.expose_secret());
        let response = self
            .with_bearer(request, access_token)
            .send()
            .await
            .context("auth provider unreachable")?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(provider_failure(status, &message));
        }

        let body: Value = response
            .json()
            .await
            .context("invalid user response from auth provider")?;
        identity_from_value(&body).ok_or_else(|| anyhow!("user response missing id").into())
    }

    #[instrument(skip_all)]
    async fn update_password(
        &self,
        access_token: &str,
        password: &SecretString,
    ) -> Result<(), AuthError> {
        let request = self
            .client
            .put(self.endpoint("/user"))
            .header("apikey", self.api_key.expose_secret())
            .json(&json!({ "password": password.expose_secret() }));
        let response = self
            .with_bearer(request, access_token)
            .send()
            .await
            .context("auth provider unreachable")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AuthError::InvalidToken);
        }
        let message = error_message(response).await;
        if status.is_client_error() {
            return Err(AuthError::Rejected(message));
        }
        Err(provider_failure(status, &message))
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .with_bearer(self.post("/logout"), access_token)
            .send()
            .await
            .context("auth provider unreachable")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AuthError::InvalidToken);
        }
        let message = error_message(response).await;
        Err(provider_failure(status, &message))
    }

    fn backend(&self) -> &'static str {
        "gotrue"
    }
}

fn provider_failure(status: StatusCode, message: &str) -> AuthError {
    error!(%status, "auth provider error: {message}");
    AuthError::Provider(anyhow!("{status}, {message}"))
}

/// Pull a human-readable message out of an error body.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    message_from_value(&body).unwrap_or_else(|| status.to_string())
}

fn message_from_value(body: &Value) -> Option<String> {
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body[*key].as_str())
        .map(str::to_string)
}

fn identity_from_value(user: &Value) -> Option<Identity> {
    let id = user["id"].as_str()?.to_string();
    let metadata = &user["user_metadata"];
    Some(Identity {
        id,
        email: user["email"].as_str().unwrap_or_default().to_string(),
        name: metadata["name"].as_str().map(str::to_string),
        username: metadata["username"].as_str().map(str::to_string),
    })
}

fn session_from_value(body: &Value) -> Option<Session> {
    Some(Session {
        access_token: body["access_token"].as_str()?.to_string(),
        refresh_token: body["refresh_token"].as_str()?.to_string(),
        expires_in: body["expires_in"].as_i64(),
        user: identity_from_value(&body["user"])?,
    })
}
