//! # CogniSentinel Emotion Tagging (`common::emotion`)
//!
//! File: cli/src/common/emotion/mod.rs
//!
//! ## Overview
//!
//! Labels an utterance with an emotion category. The pretrained model lives in
//! an external tagging service; this module holds the client side of it and a
//! keyword tagger used whenever the service is not configured, unreachable, or
//! returns no label.
//!
//! ## Architecture
//!
//! - `Emotion`: the closed category set, with alias parsing (`sad` → `sadness`).
//! - `EmotionReading`: the label, a confidence and how it was obtained.
//! - `EmotionTagger`: async trait implemented by `KeywordTagger` and
//!   `RemoteTagger`; action handlers only see `Arc<dyn EmotionTagger>`.
//!
use crate::core::config::ActionsConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

mod keywords;
mod remote;

pub use keywords::KeywordTagger;
pub use remote::RemoteTagger;

/// Emotion categories understood by the action handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Disgust,
    Surprise,
    Neutral,
}

impl Emotion {
    /// Parses a free-form label. Aliases map onto their category; anything
    /// unrecognised is `Neutral`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "joy" | "happy" | "happiness" | "excited" => Emotion::Joy,
            "sadness" | "sad" => Emotion::Sadness,
            "anger" | "angry" => Emotion::Anger,
            "fear" | "afraid" | "anxious" | "anxiety" => Emotion::Fear,
            "disgust" => Emotion::Disgust,
            "surprise" => Emotion::Surprise,
            _ => Emotion::Neutral,
        }
    }

    /// Canonical lowercase name, stored in the `detected_emotion` slot.
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Disgust => "disgust",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a reading was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Label returned by the external tagging service.
    Model,
    Keywords,
    /// Empty input; nothing to tag.
    Default,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectionMethod::Model => "model",
            DetectionMethod::Keywords => "keywords",
            DetectionMethod::Default => "default",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionReading {
    pub emotion: Emotion,
    pub confidence: f64,
    pub method: DetectionMethod,
}

impl EmotionReading {
    /// Reading for empty input.
    pub fn empty() -> Self {
        Self {
            emotion: Emotion::Neutral,
            confidence: 0.0,
            method: DetectionMethod::Default,
        }
    }
}

/// Something that can label text with an emotion. Tagging never fails: an
/// implementation that cannot reach its backend degrades to keywords.
#[async_trait]
pub trait EmotionTagger: Send + Sync {
    async fn tag(&self, text: &str) -> EmotionReading;
}

/// Builds the tagger described by the action server configuration.
pub fn build_tagger(config: &ActionsConfig, client: reqwest::Client) -> Arc<dyn EmotionTagger> {
    match &config.tagger_url {
        Some(url) => {
            info!("Emotion tagging via {}", url);
            Arc::new(RemoteTagger::new(client, url.clone()))
        }
        None => {
            info!("No tagger_url configured; emotion tagging uses keywords.");
            Arc::new(KeywordTagger)
        }
    }
}
