//! # Keyword Emotion Tagger
//!
//! File: cli/src/common/emotion/keywords.rs
//!
//! Substring matching against a small lexicon per emotion. The emotion with
//! the most matching keywords wins; ties go to the earlier row of `LEXICON`.
//! Confidence is 0.5 when nothing matched and otherwise grows with the share
//! of matches the winner holds, capped at 0.9.
//!
use super::{DetectionMethod, Emotion, EmotionReading, EmotionTagger};
use async_trait::async_trait;

const LEXICON: &[(Emotion, &[&str])] = &[
    (
        Emotion::Joy,
        &[
            "happy", "glad", "joy", "excited", "pleased", "delighted", "content", "cheerful",
            "thrilled", "wonderful",
        ],
    ),
    (
        Emotion::Sadness,
        &[
            "sad", "unhappy", "depressed", "down", "miserable", "heartbroken", "gloomy",
            "disappointed", "upset", "grief",
        ],
    ),
    (
        Emotion::Anger,
        &[
            "angry", "mad", "furious", "irritated", "annoyed", "frustrated", "outraged",
            "enraged", "hostile", "bitter",
        ],
    ),
    (
        Emotion::Fear,
        &[
            "afraid", "scared", "frightened", "terrified", "anxious", "worried", "nervous",
            "panicked", "stressed", "uneasy",
        ],
    ),
    (
        Emotion::Neutral,
        &["okay", "fine", "neutral", "normal", "average", "so-so"],
    ),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordTagger;

impl KeywordTagger {
    pub fn detect(&self, text: &str) -> EmotionReading {
        if text.trim().is_empty() {
            return EmotionReading::empty();
        }
        let lowered = text.to_lowercase();

        let scores: Vec<(Emotion, usize)> = LEXICON
            .iter()
            .map(|(emotion, words)| {
                let hits = words.iter().filter(|w| lowered.contains(**w)).count();
                (*emotion, hits)
            })
            .collect();

        let mut best = (Emotion::Neutral, 0);
        for &(emotion, score) in &scores {
            if score > best.1 {
                best = (emotion, score);
            }
        }

        let total: usize = scores.iter().map(|(_, s)| s).sum();
        let confidence = if total > 0 {
            (0.5 + (best.1 as f64 / total as f64) * 0.4).min(0.9)
        } else {
            0.5
        };

        EmotionReading {
            emotion: best.0,
            confidence,
            method: DetectionMethod::Keywords,
        }
    }
}

#[async_trait]
impl EmotionTagger for KeywordTagger {
    async fn tag(&self, text: &str) -> EmotionReading {
        self.detect(text)
    }
}
