use super::{
    principal::extract_bearer_token,
    types::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest},
};
use crate::{
    api::error::{ApiError, ErrorBody},
    identity::{AuthError, SharedIdentityProvider},
};
use axum::{extract::rejection::JsonRejection, http::HeaderMap, Extension, Json};
use secrecy::SecretString;
use tracing::{error, instrument};

const FORGOT_PASSWORD_MESSAGE: &str = "If the email exists, a password reset link has been sent";

#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Recovery started when the account exists", body = MessageResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn forgot_password(
    identity: Extension<SharedIdentityProvider>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    // Same answer either way so callers cannot tell which emails are registered.
    if let Err(err) = identity.recover(&request.email).await {
        error!("Password recovery failed: {err:#}");
    }
    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Password rejected", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn reset_password(
    headers: HeaderMap,
    identity: Extension<SharedIdentityProvider>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let access_token =
        extract_bearer_token(&headers).ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
    let Json(request) = payload?;
    let password = SecretString::from(request.new_password);

    match identity.update_password(&access_token, &password).await {
        Ok(()) => Ok(Json(MessageResponse::new("Password updated successfully"))),
        Err(AuthError::InvalidToken) => {
            Err(ApiError::unauthorized("Could not validate credentials"))
        }
        Err(err) => {
            error!("Password reset failed: {err:#}");
            Err(ApiError::bad_request(format!("Password reset failed: {err}")))
        }
    }
}
