use super::auth::require_auth;
use crate::{
    api::error::{ApiError, ErrorBody},
    identity::{Identity, SharedIdentityProvider},
    tickets::{SharedTicketStore, TicketSummary},
};
use axum::{http::HeaderMap, Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Dashboard {
    pub message: String,
    pub user: Identity,
    pub summary: TicketSummary,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/",
    responses(
        (status = 200, description = "Dashboard for the signed-in employee", body = Dashboard),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    tag = "admin"
)]
pub async fn dashboard(
    headers: HeaderMap,
    identity: Extension<SharedIdentityProvider>,
    tickets: Extension<SharedTicketStore>,
) -> Result<Json<Dashboard>, ApiError> {
    let principal = require_auth(&headers, identity.0.as_ref()).await?;
    let summary = tickets.summary().await?;

    Ok(Json(Dashboard {
        message: "Admin".to_string(),
        user: principal.user,
        summary,
    }))
}
