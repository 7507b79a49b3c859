use axum::{response::IntoResponse, Json};
use serde_json::json;

// axum handler for root
pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Sahay API is running", "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use crate::api::handlers::test_support::{app, send, services};
    use crate::chat::Assistant;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn root_reports_running() {
        let app = app(services(Assistant::unconfigured()));
        let (status, body) = send(&app, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Sahay API is running", "status": "ok" }));
    }
}
