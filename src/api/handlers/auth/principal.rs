//! Authenticated principal extraction.
//!
//! Flow Overview: read the bearer token, ask the identity provider who it
//! belongs to, and hand the resulting principal to the handler.

use crate::{
    api::error::ApiError,
    identity::{AuthError, Identity, IdentityProvider},
};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use tracing::error;

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user: Identity,
    pub access_token: String,
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the bearer token into a principal, or return 401.
pub async fn require_auth(
    headers: &HeaderMap,
    identity: &dyn IdentityProvider,
) -> Result<Principal, ApiError> {
    let access_token =
        extract_bearer_token(headers).ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    match identity.get_user(&access_token).await {
        Ok(user) => Ok(Principal { user, access_token }),
        Err(AuthError::Provider(err)) => {
            error!("Failed to resolve access token: {err:#}");
            Err(ApiError::new(
                StatusCode::BAD_GATEWAY,
                "Authentication service error",
            ))
        }
        Err(_) => Err(ApiError::unauthorized("Could not validate credentials")),
    }
}
