//! JSON error responses. Every failure leaves the API as `{"detail": "..."}`.

use crate::{chat::ChatError, tickets::TicketError};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::NotFound => Self::not_found(err.to_string()),
            TicketError::Validation(detail) => Self::bad_request(detail),
            TicketError::DuplicateNumber(_) | TicketError::Storage(_) => {
                error!("ticket storage failure: {err:#}");
                Self::internal()
            }
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let status = match err {
            ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
            ChatError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        let detail = match &err {
            ChatError::Upstream(_) => "Error contacting chat model".to_string(),
            other => other.to_string(),
        };
        Self::new(status, detail)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        (
            status,
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
        )
    }

    #[tokio::test]
    async fn renders_detail() {
        let (status, body) = body_of(ApiError::unauthorized("Not authenticated")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "detail": "Not authenticated" }));
    }

    #[tokio::test]
    async fn ticket_errors_map_to_status() {
        let (status, body) = body_of(TicketError::NotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Ticket not found");

        let err: ApiError = TicketError::Validation("title too short".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let (status, body) = body_of(TicketError::Storage(anyhow!("pool closed")).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }

    #[test]
    fn chat_errors_map_to_status() {
        let status = |err: ChatError| ApiError::from(err).status();
        assert_eq!(status(ChatError::EmptyMessage), StatusCode::BAD_REQUEST);
        assert_eq!(status(ChatError::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status(ChatError::Upstream(anyhow!("quota"))),
            StatusCode::BAD_GATEWAY
        );
    }
}
