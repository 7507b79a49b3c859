//! In-process identity provider.
//!
//! Users live in memory and vanish on restart. Passwords are Argon2id hashes,
//! tokens are stored as SHA-256 digests. Used for local runs and tests when no
//! hosted provider is configured.

use super::{
    generate_token, hash_token, normalize_email,
    password::{hash_password, verify_password},
    AuthError, Identity, IdentityProvider, Session, SignUp,
};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 3600;
pub const MIN_PASSWORD_LENGTH: usize = 6;
const REFRESH_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

struct UserRecord {
    identity: Identity,
    password_hash: String,
}

struct Grant {
    user_id: String,
    expires_at: Instant,
}

impl Grant {
    fn new(user_id: &str, ttl: Duration) -> Self {
        Self {
            user_id: user_id.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
struct Directory {
    /// Keyed by user id.
    users: HashMap<String, UserRecord>,
    /// Normalized email to user id.
    emails: HashMap<String, String>,
    /// Keyed by token hash.
    access: HashMap<Vec<u8>, Grant>,
    refresh: HashMap<Vec<u8>, Grant>,
}

impl Directory {
    fn user_for_access(&self, access_token: &str) -> Result<&UserRecord, AuthError> {
        let grant = self
            .access
            .get(&hash_token(access_token))
            .ok_or(AuthError::InvalidToken)?;
        if !grant.is_live(Instant::now()) {
            return Err(AuthError::InvalidToken);
        }
        self.users.get(&grant.user_id).ok_or(AuthError::InvalidToken)
    }

    fn prune(&mut self) {
        let now = Instant::now();
        self.access.retain(|_, grant| grant.is_live(now));
        self.refresh.retain(|_, grant| grant.is_live(now));
    }

    /// Insert an access grant and return the raw token.
    fn grant_access(&mut self, user_id: &str, ttl: Duration) -> Result<String, AuthError> {
        self.prune();
        let token = generate_token()?;
        self.access.insert(hash_token(&token), Grant::new(user_id, ttl));
        Ok(token)
    }
}

#[derive(Clone)]
pub struct MemoryProvider {
    directory: Arc<RwLock<Directory>>,
    session_ttl: Duration,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS))
    }
}

impl MemoryProvider {
    #[must_use]
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            directory: Arc::new(RwLock::new(Directory::default())),
            session_ttl,
        }
    }

    fn issue(&self, directory: &mut Directory, user: &Identity) -> Result<Session, AuthError> {
        let access_token = directory.grant_access(&user.id, self.session_ttl)?;
        let refresh_token = generate_token()?;
        directory
            .refresh
            .insert(hash_token(&refresh_token), Grant::new(&user.id, REFRESH_TTL));

        Ok(Session {
            access_token,
            refresh_token,
            expires_in: i64::try_from(self.session_ttl.as_secs()).ok(),
            user: user.clone(),
        })
    }
}

fn check_password_length(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Rejected(format!(
            "Password should be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

async fn hash_blocking(password: &SecretString) -> Result<String, AuthError> {
    let password = password.expose_secret().to_string();
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task failed")??;
    Ok(hash)
}

async fn verify_blocking(password: &SecretString, hash: String) -> Result<bool, AuthError> {
    let password = password.expose_secret().to_string();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .context("password verification task failed")??;
    Ok(matches)
}

#[async_trait]
impl IdentityProvider for MemoryProvider {
    async fn sign_up(&self, request: &SignUp) -> Result<Session, AuthError> {
        let email = normalize_email(&request.email);
        if email.is_empty() {
            return Err(AuthError::Rejected("email is required".to_string()));
        }
        check_password_length(&request.password)?;

        if self.directory.read().await.emails.contains_key(&email) {
            return Err(AuthError::AlreadyRegistered);
        }

        let password_hash = hash_blocking(&request.password).await?;

        let mut directory = self.directory.write().await;
        // Re-check under the write lock: another sign-up may have raced us.
        if directory.emails.contains_key(&email) {
            return Err(AuthError::AlreadyRegistered);
        }

        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            name: Some(request.name.trim().to_string()).filter(|name| !name.is_empty()),
            username: Some(request.username.trim().to_string()).filter(|name| !name.is_empty()),
        };
        directory.emails.insert(email, identity.id.clone());
        directory.users.insert(
            identity.id.clone(),
            UserRecord {
                identity: identity.clone(),
                password_hash,
            },
        );
        debug!(user_id = %identity.id, "user registered");

        self.issue(&mut directory, &identity)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let (identity, password_hash) = {
            let directory = self.directory.read().await;
            let record = directory
                .emails
                .get(&email)
                .and_then(|id| directory.users.get(id))
                .ok_or(AuthError::InvalidCredentials)?;
            (record.identity.clone(), record.password_hash.clone())
        };

        if !verify_blocking(password, password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let mut directory = self.directory.write().await;
        self.issue(&mut directory, &identity)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let mut directory = self.directory.write().await;
        let grant = directory
            .refresh
            .remove(&hash_token(refresh_token))
            .filter(|grant| grant.is_live(Instant::now()))
            .ok_or(AuthError::InvalidToken)?;
        let identity = directory
            .users
            .get(&grant.user_id)
            .map(|record| record.identity.clone())
            .ok_or(AuthError::InvalidToken)?;
        self.issue(&mut directory, &identity)
    }

    async fn recover(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let mut directory = self.directory.write().await;
        let Some(identity) = directory
            .emails
            .get(&email)
            .and_then(|id| directory.users.get(id))
            .map(|record| record.identity.clone())
        else {
            debug!("password recovery requested for unknown email");
            return Ok(());
        };

        // No mail transport in-process: the recovery token is a bare access
        // token that works against reset-password. It cannot be refreshed.
        let token = directory.grant_access(&identity.id, self.session_ttl)?;
        info!(
            user_id = %identity.id,
            recovery_token = %token,
            "password recovery token issued"
        );
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity, AuthError> {
        let directory = self.directory.read().await;
        directory
            .user_for_access(access_token)
            .map(|record| record.identity.clone())
    }

    async fn update_password(
        &self,
        access_token: &str,
        password: &SecretString,
    ) -> Result<(), AuthError> {
        check_password_length(password)?;
        let user_id = self.get_user(access_token).await?.id;
        let password_hash = hash_blocking(password).await?;

        let mut directory = self.directory.write().await;
        let record = directory
            .users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("user {user_id} disappeared during password update"))?;
        record.password_hash = password_hash;
        debug!(user_id = %user_id, "password updated");
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let mut directory = self.directory.write().await;
        let grant = directory
            .access
            .remove(&hash_token(access_token))
            .ok_or(AuthError::InvalidToken)?;
        directory
            .refresh
            .retain(|_, other| other.user_id != grant.user_id);
        directory
            .access
            .retain(|_, other| other.user_id != grant.user_id);
        debug!(user_id = %grant.user_id, "user signed out");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
