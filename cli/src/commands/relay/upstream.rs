//! # Dialogue Engine Client
//!
//! File: cli/src/commands/relay/upstream.rs
//!
//! The relay's only outbound dependency: the dialogue engine's REST channel
//! (`POST /webhooks/rest/webhook`) and its `/status` endpoint. Any failure is
//! folded into a `SentinelError` so the HTTP handler can answer with the
//! fixed fallback text instead of a raw error.
//!
use crate::common::network;
use crate::core::error::SentinelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "Dialogue engine";
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Body of `POST /api/chat`.
#[derive(Deserialize, Debug)]
pub struct RelayRequest {
    pub message: String,
    #[serde(default)]
    pub sender: Option<String>,
}

/// One message produced by the engine's REST channel.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BotMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Value>>,
}

/// Body returned to the browser.
#[derive(Serialize, Debug)]
pub struct RelayReply {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<BotMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

#[derive(Serialize)]
struct EngineRequest<'a> {
    sender: &'a str,
    message: &'a str,
}

#[derive(Debug, Clone)]
pub struct DialogueEngineClient {
    client: reqwest::Client,
    webhook_url: String,
    status_url: String,
    timeout: Duration,
}

impl DialogueEngineClient {
    pub fn new(client: reqwest::Client, engine_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            webhook_url: network::join_url(engine_url, "webhooks/rest/webhook"),
            status_url: network::join_url(engine_url, "status"),
            timeout,
        }
    }

    /// # Send Message (`send`)
    ///
    /// Forwards one user message and returns the engine's replies in order.
    /// No retries.
    ///
    /// ## Errors
    ///
    /// - `Upstream` on connect errors and timeouts.
    /// - `UpstreamStatus` on a non-2xx answer.
    /// - `UpstreamReply` when the body is not a list of messages.
    pub async fn send(&self, sender: &str, message: &str) -> Result<Vec<BotMessage>, SentinelError> {
        debug!("Forwarding message from '{}' to {}", sender, self.webhook_url);
        let response = self
            .client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&EngineRequest { sender, message })
            .send()
            .await
            .map_err(|e| SentinelError::Upstream {
                service: SERVICE.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SentinelError::UpstreamStatus {
                service: SERVICE.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<BotMessage>>()
            .await
            .map_err(|e| SentinelError::UpstreamReply {
                service: SERVICE.to_string(),
                reason: e.to_string(),
            })
    }

    /// Whether the engine's `/status` endpoint answers.
    pub async fn probe(&self) -> bool {
        network::probe_status(&self.client, &self.status_url, STATUS_TIMEOUT).await
    }
}
