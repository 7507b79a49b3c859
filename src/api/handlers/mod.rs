pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;
pub mod root;
pub mod tickets;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{
        api::{router, Services},
        chat::Assistant,
        identity::memory::MemoryProvider,
        tickets::memory::MemoryTicketStore,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, HeaderValue, Request, StatusCode},
        response::Response,
        Router,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    pub(crate) fn services(assistant: Assistant) -> Services {
        Services {
            tickets: Arc::new(MemoryTicketStore::default()),
            identity: Arc::new(MemoryProvider::default()),
            assistant: Arc::new(assistant),
        }
    }

    pub(crate) fn app(services: Services) -> Router {
        router(services, HeaderValue::from_static("http://localhost:5173"))
    }

    pub(crate) async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        };
        let response = match request {
            Ok(request) => app.clone().oneshot(request).await,
            Err(err) => panic!("failed to build request: {err}"),
        };
        match response {
            Ok(response) => split(response).await,
            Err(err) => match err {},
        }
    }

    async fn split(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Register a user and return its access token.
    pub(crate) async fn signed_up(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": "secret-pass",
                "name": "Asha Verma",
                "username": "asha",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap_or_default().to_string()
    }
}
