//! Delegated authentication.
//!
//! Handlers never verify credentials themselves: every sign-in, sign-out,
//! refresh and token lookup goes through an [`IdentityProvider`]. The hosted
//! provider is [`gotrue::GoTrueProvider`]; [`memory::MemoryProvider`] offers
//! the same contract in-process.

pub mod gotrue;
pub mod memory;
mod password;
mod token;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub use token::{generate_token, hash_token};

pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

/// Profile of an authenticated user as exposed by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub username: Option<String>,
}

/// Token pair issued by the provider.
#[derive(Clone, Debug)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
    pub user: Identity,
}

#[derive(Debug)]
pub struct SignUp {
    pub email: String,
    pub password: SecretString,
    pub name: String,
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    AlreadyRegistered,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("email confirmation required")]
    ConfirmationRequired,
    /// The provider refused the request with a user-facing reason.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, request: &SignUp) -> Result<Session, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, AuthError>;

    /// Exchange a refresh token for a new token pair; the old refresh token is spent.
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;

    /// Start password recovery. Unknown emails succeed silently.
    async fn recover(&self, email: &str) -> Result<(), AuthError>;

    /// Resolve an access token into its user.
    async fn get_user(&self, access_token: &str) -> Result<Identity, AuthError>;

    async fn update_password(
        &self,
        access_token: &str,
        password: &SecretString,
    ) -> Result<(), AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Short backend label reported by `/health`.
    fn backend(&self) -> &'static str;
}

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
