use crate::{
    api::error::{ApiError, ErrorBody},
    chat::Assistant,
};
use axum::{extract::rejection::JsonRejection, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatbotResponse {
    pub response: String,
}

#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer from the SAHAY assistant", body = ChatReply),
        (status = 400, description = "Empty message", body = ErrorBody),
        (status = 502, description = "Chat model failed", body = ErrorBody),
        (status = 503, description = "Chat model not configured", body = ErrorBody),
    ),
    tag = "chat"
)]
pub async fn chat(
    assistant: Extension<Arc<Assistant>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = payload?;
    let reply = assistant.reply(&request.message).await?;
    Ok(Json(ChatReply { reply }))
}

#[utoipa::path(
    post,
    path = "/api/v1/chatbot",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Raw model response", body = ChatbotResponse),
        (status = 400, description = "Empty message", body = ErrorBody),
        (status = 502, description = "Chat model failed", body = ErrorBody),
        (status = 503, description = "Chat model not configured", body = ErrorBody),
    ),
    tag = "chat"
)]
pub async fn chatbot(
    assistant: Extension<Arc<Assistant>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatbotResponse>, ApiError> {
    let Json(request) = payload?;
    let response = assistant.respond(&request.message).await?;
    Ok(Json(ChatbotResponse { response }))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::handlers::test_support::{app, send, services},
        chat::{employee_prompt, tests::EchoModel, Assistant},
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn chat_wraps_message_in_persona() {
        let model = Arc::new(EchoModel::default());
        let app = app(services(Assistant::new(model.clone())));

        for uri in ["/api/chat", "/api/chat/"] {
            let (status, body) = send(
                &app,
                "POST",
                uri,
                None,
                Some(json!({ "message": "My VPN is down" })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["reply"], "Please restart the VPN client.");
        }

        let prompts = model.prompts.lock().map(|p| p.clone()).unwrap_or_default();
        assert_eq!(prompts, vec![employee_prompt("My VPN is down"); 2]);
    }

    #[tokio::test]
    async fn chatbot_forwards_raw_message() {
        let model = Arc::new(EchoModel::default());
        let app = app(services(Assistant::new(model.clone())));

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/chatbot",
            None,
            Some(json!({ "message": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Please restart the VPN client.");

        let prompts = model.prompts.lock().map(|p| p.clone()).unwrap_or_default();
        assert_eq!(prompts, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn chat_error_statuses() {
        let app_without_model = app(services(Assistant::unconfigured()));
        let (status, _) = send(
            &app_without_model,
            "POST",
            "/api/chat",
            None,
            Some(json!({ "message": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let failing = app(services(Assistant::new(Arc::new(EchoModel {
            fail: true,
            ..EchoModel::default()
        }))));
        let (status, body) = send(
            &failing,
            "POST",
            "/api/v1/chatbot",
            None,
            Some(json!({ "message": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["detail"], "Error contacting chat model");

        let (status, _) = send(
            &failing,
            "POST",
            "/api/chat",
            None,
            Some(json!({ "message": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
