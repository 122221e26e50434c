//! # Language-Model Fallback Client
//!
//! File: cli/src/commands/actions/llm.rs
//!
//! ## Overview
//!
//! A minimal client for an OpenAI-compatible chat-completion endpoint, used
//! when the action server wants a free-form supportive reply instead of a
//! canned one. One system prompt, one user message, one answer.
//!
//! Failures are returned as `SentinelError` so callers can tell a transport
//! problem (`Upstream`) from a refusal (`UpstreamStatus`, `UpstreamReply`,
//! `MissingApiKey`); the fallback action answers differently for each.
//!
use crate::core::config::ActionsConfig;
use crate::core::error::SentinelError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE: &str = "Language model";
const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Builds the system prompt, optionally carrying what the user seems to feel.
pub fn system_prompt(emotion_context: Option<&str>) -> String {
    let context = emotion_context
        .map(|emotion| format!("The user seems to be feeling {}. ", emotion))
        .unwrap_or_default();
    format!(
        "You are an empathetic mental health assistant. {}Provide a supportive response that \
         acknowledges the user's feelings and offers gentle guidance. Keep your response concise \
         (2-3 sentences) and focus on emotional support rather than clinical advice.",
        context
    )
}

#[derive(Debug, Clone)]
pub struct SupportModel {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl SupportModel {
    pub fn new(client: reqwest::Client, config: &ActionsConfig) -> Self {
        Self {
            client,
            url: config.llm_url.clone(),
            model: config.llm_model.clone(),
            api_key: config
                .llm_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        }
    }

    /// # Ask For A Reply (`reply`)
    ///
    /// Sends one chat-completion request and returns the first choice's text.
    ///
    /// ## Errors
    ///
    /// - `MissingApiKey` without sending anything when no key is configured.
    /// - `Upstream` for connect failures and timeouts.
    /// - `UpstreamStatus` for a non-2xx answer.
    /// - `UpstreamReply` when the body has no usable choice.
    pub async fn reply(&self, system_prompt: &str, user_message: &str) -> Result<String, SentinelError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| SentinelError::MissingApiKey {
            service: SERVICE.to_string(),
        })?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        debug!("Requesting supportive reply from {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| SentinelError::Upstream {
                service: SERVICE.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} answered {}", SERVICE, status);
            return Err(SentinelError::UpstreamStatus {
                service: SERVICE.to_string(),
                status: status.as_u16(),
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| SentinelError::UpstreamReply {
            service: SERVICE.to_string(),
            reason: e.to_string(),
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| SentinelError::UpstreamReply {
                service: SERVICE.to_string(),
                reason: "no choices in reply".to_string(),
            })
    }
}
