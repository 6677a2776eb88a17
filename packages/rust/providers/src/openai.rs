//! OpenAI-compatible chat completions adapter.
//!
//! Works against any endpoint speaking the `/chat/completions` protocol
//! (OpenAI, DeepSeek, OpenRouter, local gateways).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use lyricsmith_shared::{CompletionConfig, LyricsmithError, Result};

use crate::http::{build_client, check_status, endpoint, transport_error};
use crate::{Completion, CompletionOptions, TextCompletion};

/// Chat completions client bound to one model.
pub struct ChatCompletionClient {
    client: Client,
    url: Url,
    api_key: String,
    model: String,
    default_max_tokens: Option<u32>,
    timeout_secs: u64,
}

impl ChatCompletionClient {
    /// Build a client from a config section, reading the key from its env var.
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            LyricsmithError::config(format!(
                "API key not found. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;
        Self::new(config, api_key)
    }

    /// Build a client from a config section and an explicit key.
    pub fn new(config: &CompletionConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: endpoint(&config.base_url, "chat/completions")?,
            api_key: api_key.into(),
            model: config.model.clone(),
            default_max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl TextCompletion for ChatCompletionClient {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let body = ChatRequest {
            model: &self.model,
            temperature: options.temperature,
            max_tokens: options.max_tokens.or(self.default_max_tokens),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
        };

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("chat completion", self.timeout_secs, e))?;

        let response = check_status("chat completion", response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LyricsmithError::Provider(format!("invalid chat completion body: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LyricsmithError::EmptyResponse(self.model.clone()))?;

        let text = choice.message.content.unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err(LyricsmithError::EmptyResponse(self.model.clone()));
        }

        let finish_reason = choice.finish_reason.unwrap_or_else(|| "stop".into());
        debug!(%finish_reason, chars = text.chars().count(), "completion received");

        Ok(Completion {
            text,
            truncated: finish_reason == "length",
            filtered: finish_reason == "content_filter",
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}
