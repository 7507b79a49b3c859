use crate::{
    chat::Assistant,
    identity::SharedIdentityProvider,
    tickets::SharedTicketStore,
    GIT_COMMIT_HASH,
};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
    store: String,
    identity: String,
    chat: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Ticket store is reachable", body = Health),
        (status = 503, description = "Ticket store is unreachable", body = Health)
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(
    method: Method,
    tickets: Extension<SharedTicketStore>,
    identity: Extension<SharedIdentityProvider>,
    assistant: Extension<Arc<Assistant>>,
) -> impl IntoResponse {
    let result = tickets.0.ping().await.map_err(|error| {
        error!("Failed to ping ticket store: {}", error);
    });

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if result.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
        store: tickets.0.backend().to_string(),
        identity: identity.0.backend().to_string(),
        chat: assistant
            .0
            .model_name()
            .unwrap_or("unconfigured")
            .to_string(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    if result.is_ok() {
        debug!("Ticket store is healthy");
        (StatusCode::OK, headers, body)
    } else {
        debug!("Ticket store is unhealthy");
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::handlers::test_support::{app, send, services},
        tickets::{
            Page, Ticket, TicketError, TicketFilter, TicketStore, TicketSummary, TicketUpdate,
        },
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use axum::http::Request;
    use chrono::{DateTime, Utc};
    use tower::ServiceExt;
    use uuid::Uuid;

    struct DownStore;

    #[async_trait]
    impl TicketStore for DownStore {
        async fn insert(&self, _: &Ticket) -> Result<(), TicketError> {
            Err(anyhow!("down").into())
        }
        async fn get(&self, _: Uuid) -> Result<Option<Ticket>, TicketError> {
            Err(anyhow!("down").into())
        }
        async fn get_by_number(&self, _: &str) -> Result<Option<Ticket>, TicketError> {
            Err(anyhow!("down").into())
        }
        async fn update(
            &self,
            _: Uuid,
            _: &TicketUpdate,
            _: DateTime<Utc>,
        ) -> Result<Option<Ticket>, TicketError> {
            Err(anyhow!("down").into())
        }
        async fn delete(&self, _: Uuid) -> Result<bool, TicketError> {
            Err(anyhow!("down").into())
        }
        async fn list(&self, _: &TicketFilter, _: Page) -> Result<Vec<Ticket>, TicketError> {
            Err(anyhow!("down").into())
        }
        async fn search(&self, _: &str, _: Page) -> Result<Vec<Ticket>, TicketError> {
            Err(anyhow!("down").into())
        }
        async fn summary(&self) -> Result<TicketSummary, TicketError> {
            Err(anyhow!("down").into())
        }
        async fn ping(&self) -> Result<(), TicketError> {
            Err(anyhow!("connection refused").into())
        }
        fn backend(&self) -> &'static str {
            "down"
        }
    }

    #[tokio::test]
    async fn health_reports_backends() {
        let app = app(services(Assistant::unconfigured()));
        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(body["database"], "ok");
        assert_eq!(body["store"], "memory");
        assert_eq!(body["identity"], "memory");
        assert_eq!(body["chat"], "unconfigured");
    }

    #[tokio::test]
    async fn health_options_has_x_app_header_and_no_body() {
        let app = app(services(Assistant::unconfigured()));
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/health")
            .body(Body::empty());
        assert!(request.is_ok());
        if let Ok(request) = request {
            let response = app.oneshot(request).await;
            assert!(response.is_ok());
            if let Ok(response) = response {
                assert_eq!(response.status(), StatusCode::OK);
                let x_app = response
                    .headers()
                    .get("X-App")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default();
                assert!(x_app.starts_with(concat!(env!("CARGO_PKG_NAME"), ":")));
            }
        }
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let mut services = services(Assistant::unconfigured());
        services.tickets = Arc::new(DownStore);
        let app = app(services);
        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["database"], "error");
    }
}
