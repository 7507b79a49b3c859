use crate::{
    api::handlers::{admin, auth, chat, health, root, tickets},
    chat::Assistant,
    identity::SharedIdentityProvider,
    tickets::SharedTicketStore,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod error;
pub(crate) mod handlers;
// OpenAPI document and route documentation live in openapi.rs.
mod openapi;

pub use error::ApiError;
pub use openapi::openapi;

/// Backends shared by every handler.
#[derive(Clone)]
pub struct Services {
    pub tickets: SharedTicketStore,
    pub identity: SharedIdentityProvider,
    pub assistant: Arc<Assistant>,
}

/// Build the application router with its middleware stack.
#[must_use]
pub fn router(services: Services, frontend_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .nest("/api/v1/auth", auth_routes())
        .route("/api/v1/admin", get(admin::dashboard))
        .route("/api/v1/admin/", get(admin::dashboard))
        .route(
            "/api/v1/ticket",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route(
            "/api/v1/ticket/",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route("/api/v1/ticket/stats/summary", get(tickets::ticket_summary))
        .route("/api/v1/ticket/search/:keyword", get(tickets::search_tickets))
        .route(
            "/api/v1/ticket/number/:ticket_number",
            get(tickets::get_ticket_by_number),
        )
        .route(
            "/api/v1/ticket/:ticket_id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/api/chat", post(chat::chat))
        .route("/api/chat/", post(chat::chat))
        .route("/api/v1/chatbot", post(chat::chatbot))
        .route("/api/v1/chatbot/", post(chat::chatbot))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(services.tickets))
                .layer(Extension(services.identity))
                .layer(Extension(services.assistant)),
        )
}

fn auth_routes() -> Router {
    Router::new()
        .route("/register", post(auth::session::register))
        .route("/login", post(auth::session::login))
        .route("/refresh", post(auth::session::refresh))
        .route("/me", get(auth::session::me))
        .route("/session", get(auth::session::session))
        .route("/logout", post(auth::session::logout))
        .route("/forgot-password", post(auth::password::forgot_password))
        .route("/reset-password", post(auth::password::reset_password))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, services: Services, frontend_base_url: &str) -> Result<()> {
    let frontend_origin = frontend_origin(frontend_base_url)?;
    let app = router(services, frontend_origin);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// Reduce the frontend base URL to the origin used for CORS.
///
/// # Errors
/// Returns an error if the URL is invalid or has no host.
pub fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
