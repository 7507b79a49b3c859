//! Ticket endpoints under `/api/v1/ticket`.
//!
//! Intake, reads, stats and search are open to the portal; update and delete
//! require a signed-in employee.

pub mod types;


use super::auth::require_auth;
use crate::{
    api::error::{ApiError, ErrorBody},
    identity::SharedIdentityProvider,
    tickets::{
        open_ticket, NewTicket, SharedTicketStore, Ticket, TicketError, TicketSummary, TicketUpdate,
    },
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::HeaderMap,
    Extension, Json,
};
use chrono::Utc;
use tracing::{debug, info, instrument};
use types::{DeletedResponse, ListParams, PageParams};
use uuid::Uuid;

fn ticket_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::from(TicketError::NotFound))
}

#[utoipa::path(
    post,
    path = "/api/v1/ticket/",
    request_body = NewTicket,
    responses(
        (status = 200, description = "Ticket created", body = Ticket),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 422, description = "Malformed payload", body = ErrorBody),
    ),
    tag = "tickets"
)]
#[instrument(skip_all)]
pub async fn create_ticket(
    tickets: Extension<SharedTicketStore>,
    payload: Result<Json<NewTicket>, JsonRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let Json(request) = payload?;
    let ticket = open_ticket(tickets.0.as_ref(), request).await?;
    info!(ticket_number = %ticket.ticket_number, "ticket created");
    Ok(Json(ticket))
}

#[utoipa::path(
    get,
    path = "/api/v1/ticket/",
    params(ListParams),
    responses(
        (status = 200, description = "Tickets, newest first", body = [Ticket]),
        (status = 400, description = "Invalid filter or paging", body = ErrorBody),
    ),
    tag = "tickets"
)]
pub async fn list_tickets(
    tickets: Extension<SharedTicketStore>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let Query(params) = params?;
    let (filter, page) = params.into_parts()?;
    Ok(Json(tickets.list(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/ticket/{ticket_id}",
    params(("ticket_id" = String, Path, description = "Ticket UUID")),
    responses(
        (status = 200, description = "Ticket", body = Ticket),
        (status = 404, description = "Ticket not found", body = ErrorBody),
    ),
    tag = "tickets"
)]
pub async fn get_ticket(
    tickets: Extension<SharedTicketStore>,
    Path(ticket_id_raw): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let id = ticket_id(&ticket_id_raw)?;
    let ticket = tickets.get(id).await?.ok_or(TicketError::NotFound)?;
    Ok(Json(ticket))
}

#[utoipa::path(
    get,
    path = "/api/v1/ticket/number/{ticket_number}",
    params(("ticket_number" = String, Path, description = "Ticket number, e.g. TKT-250101-1234")),
    responses(
        (status = 200, description = "Ticket", body = Ticket),
        (status = 404, description = "Ticket not found", body = ErrorBody),
    ),
    tag = "tickets"
)]
pub async fn get_ticket_by_number(
    tickets: Extension<SharedTicketStore>,
    Path(ticket_number): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let ticket = tickets
        .get_by_number(&ticket_number)
        .await?
        .ok_or(TicketError::NotFound)?;
    Ok(Json(ticket))
}

#[utoipa::path(
    put,
    path = "/api/v1/ticket/{ticket_id}",
    params(("ticket_id" = String, Path, description = "Ticket UUID")),
    request_body = TicketUpdate,
    responses(
        (status = 200, description = "Updated ticket", body = Ticket),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Ticket not found", body = ErrorBody),
    ),
    tag = "tickets"
)]
#[instrument(skip_all)]
pub async fn update_ticket(
    headers: HeaderMap,
    identity: Extension<SharedIdentityProvider>,
    tickets: Extension<SharedTicketStore>,
    Path(ticket_id_raw): Path<String>,
    payload: Result<Json<TicketUpdate>, JsonRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let principal = require_auth(&headers, identity.0.as_ref()).await?;
    let id = ticket_id(&ticket_id_raw)?;
    let Json(update) = payload?;

    let ticket = tickets
        .update(id, &update, Utc::now())
        .await?
        .ok_or(TicketError::NotFound)?;
    debug!(user_id = %principal.user.id, status = %ticket.status, "ticket updated");
    Ok(Json(ticket))
}

#[utoipa::path(
    delete,
    path = "/api/v1/ticket/{ticket_id}",
    params(("ticket_id" = String, Path, description = "Ticket UUID")),
    responses(
        (status = 200, description = "Ticket deleted", body = DeletedResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Ticket not found", body = ErrorBody),
    ),
    tag = "tickets"
)]
#[instrument(skip_all)]
pub async fn delete_ticket(
    headers: HeaderMap,
    identity: Extension<SharedIdentityProvider>,
    tickets: Extension<SharedTicketStore>,
    Path(ticket_id_raw): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let principal = require_auth(&headers, identity.0.as_ref()).await?;
    let id = ticket_id(&ticket_id_raw)?;

    if !tickets.delete(id).await? {
        return Err(TicketError::NotFound.into());
    }
    info!(user_id = %principal.user.id, "ticket deleted");
    Ok(Json(DeletedResponse {
        message: "Ticket deleted successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/ticket/stats/summary",
    responses(
        (status = 200, description = "Ticket counters", body = TicketSummary),
    ),
    tag = "tickets"
)]
pub async fn ticket_summary(
    tickets: Extension<SharedTicketStore>,
) -> Result<Json<TicketSummary>, ApiError> {
    Ok(Json(tickets.summary().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/ticket/search/{keyword}",
    params(
        ("keyword" = String, Path, description = "Case-insensitive text matched against title and description"),
        PageParams
    ),
    responses(
        (status = 200, description = "Matching tickets, newest first", body = [Ticket]),
        (status = 400, description = "Invalid paging", body = ErrorBody),
    ),
    tag = "tickets"
)]
pub async fn search_tickets(
    tickets: Extension<SharedTicketStore>,
    Path(keyword): Path<String>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let Query(params) = params?;
    let page = params.page()?;
    Ok(Json(tickets.search(&keyword, page).await?))
}
