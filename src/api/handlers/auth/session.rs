//! Sign-up, sign-in and session endpoints. Everything is forwarded to the
//! identity provider; nothing here touches a password hash.

use super::{
    principal::{extract_bearer_token, require_auth},
    types::{
        LoginRequest, MessageResponse, RefreshQuery, RefreshRequest, RegisterRequest, TokenResponse,
    },
};
use crate::{
    api::error::{ApiError, ErrorBody},
    identity::{AuthError, Identity, SharedIdentityProvider, SignUp},
    tickets::valid_email,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use secrecy::SecretString;
use tracing::{debug, error, instrument, warn};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered and signed in", body = TokenResponse),
        (status = 400, description = "Email already registered or registration failed", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    identity: Extension<SharedIdentityProvider>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    if !valid_email(request.email.trim()) {
        return Err(ApiError::bad_request(
            "Registration failed: invalid email address",
        ));
    }

    let sign_up = SignUp {
        email: request.email,
        password: SecretString::from(request.password),
        name: request.name,
        username: request.username,
    };

    match identity.sign_up(&sign_up).await {
        Ok(session) => {
            debug!(user_id = %session.user.id, "user registered");
            Ok(Json(TokenResponse::from(session)))
        }
        Err(AuthError::AlreadyRegistered) => Err(ApiError::bad_request("Email already registered")),
        Err(err) => {
            warn!("Registration failed: {err:#}");
            Err(ApiError::bad_request(format!("Registration failed: {err}")))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 401, description = "Incorrect email or password", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    identity: Extension<SharedIdentityProvider>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    let password = SecretString::from(request.password);

    match identity
        .sign_in_with_password(&request.email, &password)
        .await
    {
        Ok(session) => Ok(Json(TokenResponse::from(session))),
        Err(err) => {
            if let AuthError::Provider(err) = &err {
                error!("Sign-in failed: {err:#}");
            }
            Err(ApiError::unauthorized("Incorrect email or password"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    params(RefreshQuery),
    request_body(content = RefreshRequest, description = "Refresh token, or use the query parameter"),
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 400, description = "No refresh token supplied", body = ErrorBody),
        (status = 401, description = "Refresh token rejected", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    identity: Extension<SharedIdentityProvider>,
    query: Result<Query<RefreshQuery>, QueryRejection>,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Query(query) = query?;
    let refresh_token = body
        .and_then(|Json(body)| body.refresh_token)
        .or(query.refresh_token)
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("refresh_token is required"))?;

    match identity.refresh(refresh_token.trim()).await {
        Ok(session) => Ok(Json(TokenResponse::from(session))),
        Err(AuthError::Provider(err)) => {
            error!("Token refresh failed: {err:#}");
            Err(ApiError::unauthorized("Token refresh failed"))
        }
        Err(err) => Err(ApiError::unauthorized(format!("Token refresh failed: {err}"))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = Identity),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    identity: Extension<SharedIdentityProvider>,
) -> Result<Json<Identity>, ApiError> {
    let principal = require_auth(&headers, identity.0.as_ref()).await?;
    Ok(Json(principal.user))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    responses(
        (status = 200, description = "Active session user", body = Identity),
        (status = 204, description = "No active session"),
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    identity: Extension<SharedIdentityProvider>,
) -> Result<Response, ApiError> {
    let Some(access_token) = extract_bearer_token(&headers) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    match identity.get_user(&access_token).await {
        Ok(user) => Ok(Json(user).into_response()),
        Err(AuthError::Provider(err)) => {
            error!("Failed to resolve session: {err:#}");
            Err(ApiError::new(
                StatusCode::BAD_GATEWAY,
                "Authentication service error",
            ))
        }
        Err(_) => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Signed out", body = MessageResponse),
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    identity: Extension<SharedIdentityProvider>,
) -> Json<MessageResponse> {
    if let Some(access_token) = extract_bearer_token(&headers) {
        if let Err(err) = identity.sign_out(&access_token).await {
            // The client drops its tokens regardless.
            debug!("Sign-out failed: {err}");
        }
    }
    Json(MessageResponse::new("Logged out successfully"))
}
