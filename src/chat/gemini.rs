//! Google Gemini `generateContent` client.

use super::ChatModel;
use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, error};
use url::Url;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone)]
pub struct GeminiModel {
    endpoint: String,
    model: String,
    api_key: SecretString,
    client: Client,
}

impl GeminiModel {
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str, api_key: SecretString) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid Gemini URL: {base_url}"))?;
        let endpoint = format!(
            "{}/v1beta/models/{model}:generateContent",
            base.as_str().trim_end_matches('/')
        );
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            endpoint,
            model: model.to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let json_response: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let error_message = json_response["error"]["message"]
                .as_str()
                .unwrap_or_default();
            error!("Gemini request failed: {}", error_message);
            return Err(anyhow!("{}, {}", status, error_message));
        }

        debug!(model = %self.model, "Gemini response received");
        extract_text(&json_response).ok_or_else(|| anyhow!("Gemini response contained no text"))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();
    if text.is_empty() { None } else { Some(text) }
}
