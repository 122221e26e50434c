//! # Remote Emotion Tagger
//!
//! File: cli/src/common/emotion/remote.rs
//!
//! Client for an external tagging service hosting the pretrained emotion
//! model. The service receives `{"text": ...}` and answers
//! `{"labels": [{"value": "sadness", "score": 0.93}, ...]}`, best label first.
//! Any failure, or an empty label list, falls back to `KeywordTagger`.
//!
use super::{DetectionMethod, Emotion, EmotionReading, EmotionTagger, KeywordTagger};
use crate::core::error::SentinelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const TAGGER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct TagResponse {
    #[serde(default)]
    labels: Vec<TagLabel>,
}

#[derive(Deserialize, Debug)]
struct TagLabel {
    value: String,
    score: f64,
}

pub struct RemoteTagger {
    client: reqwest::Client,
    url: String,
    fallback: KeywordTagger,
}

impl RemoteTagger {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self {
            client,
            url,
            fallback: KeywordTagger,
        }
    }

    async fn request_label(&self, text: &str) -> Result<Option<TagLabel>, SentinelError> {
        let unreachable = |e: reqwest::Error| SentinelError::Upstream {
            service: "Emotion tagger".to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .timeout(TAGGER_TIMEOUT)
            .json(&TagRequest { text })
            .send()
            .await
            .map_err(unreachable)?;

        if !response.status().is_success() {
            return Err(SentinelError::UpstreamStatus {
                service: "Emotion tagger".to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: TagResponse = response.json().await.map_err(unreachable)?;
        Ok(body.labels.into_iter().next())
    }
}

#[async_trait]
impl EmotionTagger for RemoteTagger {
    async fn tag(&self, text: &str) -> EmotionReading {
        if text.trim().is_empty() {
            return EmotionReading::empty();
        }
        match self.request_label(text).await {
            Ok(Some(label)) => {
                debug!("Tagger labelled text as {} ({})", label.value, label.score);
                EmotionReading {
                    emotion: Emotion::from_label(&label.value),
                    confidence: label.score,
                    method: DetectionMethod::Model,
                }
            }
            Ok(None) => {
                debug!("Tagger returned no label; using keywords.");
                self.fallback.detect(text)
            }
            Err(e) => {
                warn!("{}; using keyword tagging.", e);
                self.fallback.detect(text)
            }
        }
    }
}
