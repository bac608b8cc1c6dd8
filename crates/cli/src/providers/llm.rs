//! OpenAI-compatible chat completion client. Works against any endpoint
//! speaking the `/chat/completions` shape, including a local Ollama
//! server, which needs no API key.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use claimflow_core::{ReasoningCapability, ReasoningError};

pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
}

impl OpenAiChat {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            timeout_secs,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl ReasoningCapability for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                ReasoningError::Timeout(self.timeout_secs)
            } else {
                ReasoningError::RequestFailed(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ReasoningError::RequestFailed(format!(
                "chat endpoint returned {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|error| ReasoningError::RequestFailed(error.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ReasoningError::RequestFailed("chat response carried no choices".to_string())
            })?;

        debug!(model = %self.model, reply_chars = content.len(), "chat completion received");
        Ok(content)
    }
}
