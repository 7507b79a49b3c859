//! Chat assistant backed by a hosted generative model.

pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, instrument};

pub const SYSTEM_PROMPT: &str = "You are SAHAY, a helpful assistant for POWERGRID employees. \
Answer in a polite, clear, and concise way. Do not use technical jargon unless necessary.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("Chat model is not configured")]
    Unavailable,
    #[error("Error contacting chat model: {0}")]
    Upstream(#[source] anyhow::Error),
}

/// A text-in, text-out generative model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

/// Wrap an employee message in the assistant persona.
#[must_use]
pub fn employee_prompt(message: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\nEmployee: {message}\nSahay:")
}

/// Front door for both chat endpoints. Holds no model when no API key is
/// configured; every request then fails with [`ChatError::Unavailable`].
#[derive(Clone, Default)]
pub struct Assistant {
    model: Option<Arc<dyn ChatModel>>,
}

impl Assistant {
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model: Some(model) }
    }

    #[must_use]
    pub fn unconfigured() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().map(|model| model.name())
    }

    /// Answer as SAHAY.
    ///
    /// # Errors
    /// See [`ChatError`].
    #[instrument(skip_all)]
    pub async fn reply(&self, message: &str) -> Result<String, ChatError> {
        let message = non_empty(message)?;
        self.generate(&employee_prompt(message)).await
    }

    /// Forward the message to the model without the persona.
    ///
    /// # Errors
    /// See [`ChatError`].
    #[instrument(skip_all)]
    pub async fn respond(&self, message: &str) -> Result<String, ChatError> {
        let message = non_empty(message)?;
        self.generate(message).await
    }

    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let model = self.model.as_ref().ok_or(ChatError::Unavailable)?;
        model.generate(prompt).await.map_err(|err| {
            error!("chat model {} failed: {err:#}", model.name());
            ChatError::Upstream(err)
        })
    }
}

fn non_empty(message: &str) -> Result<&str, ChatError> {
    let message = message.trim();
    if message.is_empty() {
        Err(ChatError::EmptyMessage)
    } else {
        Ok(message)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    /// Records prompts and answers with a canned reply.
    #[derive(Default)]
    pub(crate) struct EchoModel {
        pub(crate) prompts: Mutex<Vec<String>>,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            if self.fail {
                return Err(anyhow!("quota exceeded"));
            }
            Ok("Please restart the VPN client.".to_string())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn employee_prompt_wraps_message() {
        let prompt = employee_prompt("My VPN is down");
        assert!(prompt.starts_with("You are SAHAY"));
        assert!(prompt.ends_with("\n\nEmployee: My VPN is down\nSahay:"));
    }

    #[tokio::test]
    async fn reply_uses_persona_and_respond_does_not() {
        let model = Arc::new(EchoModel::default());
        let assistant = Assistant::new(model.clone());

        let reply = assistant.reply("  My VPN is down ").await;
        assert_eq!(reply.ok().as_deref(), Some("Please restart the VPN client."));
        let raw = assistant.respond("hello").await;
        assert!(raw.is_ok());

        let prompts = model.prompts.lock().map(|p| p.clone()).unwrap_or_default();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], employee_prompt("My VPN is down"));
        assert_eq!(prompts[1], "hello");
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_the_model() {
        let model = Arc::new(EchoModel::default());
        let assistant = Assistant::new(model.clone());
        assert!(matches!(
            assistant.reply("   ").await,
            Err(ChatError::EmptyMessage)
        ));
        assert!(model.prompts.lock().map(|p| p.is_empty()).unwrap_or(false));
    }

    #[tokio::test]
    async fn unconfigured_assistant_is_unavailable() {
        let assistant = Assistant::unconfigured();
        assert!(assistant.model_name().is_none());
        assert!(matches!(
            assistant.respond("hi").await,
            Err(ChatError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn model_failure_is_upstream() {
        let assistant = Assistant::new(Arc::new(EchoModel {
            fail: true,
            ..EchoModel::default()
        }));
        assert!(matches!(
            assistant.reply("hi").await,
            Err(ChatError::Upstream(_))
        ));
    }
}
