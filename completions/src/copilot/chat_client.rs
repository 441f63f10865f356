//! Chat-completion provider client
//!
//! Thin client over an OpenAI-compatible `/v1/chat/completions` endpoint.
//! The first choice's message content is taken as-is; a non-success status
//! is fatal for the question at hand — no retry, and never a silent
//! downgrade to the rule-based responder.

use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{CompletionsError, CompletionsResult};

const DEFAULT_BASE_URL: &str = "https://ai.gateway.lovable.dev";
const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Chat provider configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl ChatConfig {
    /// Build from environment variables. Returns `None` when no credential
    /// is configured — the absence of a key is what selects the rule-based
    /// strategy, never a provider failure.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("AI_API_KEY").ok()?;
        Some(Self {
            api_key,
            base_url: std::env::var("AI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        })
    }
}

#[derive(Clone)]
pub struct ChatClient {
    config: ChatConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one system + user exchange and return the first response message.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> CompletionsResult<String> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(model = %self.config.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "model": self.config.model,
                "messages": [
                    { "role": "system", "content": system_prompt },
                    { "role": "user", "content": user_prompt },
                ],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Chat provider returned an error");
            return Err(CompletionsError::Provider {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CompletionsError::Provider {
                status: status.as_u16(),
                message: "respuesta vacía del proveedor".to_string(),
            })
    }
}
