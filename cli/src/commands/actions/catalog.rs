//! # Canned Support Content
//!
//! File: cli/src/commands/actions/catalog.rs
//!
//! Fixed text used by the action handlers: coping techniques and empathetic
//! replies per emotion, fallback quotes, and the emotion-specific lead-ins.
//! Emotions without their own table (disgust, surprise) use the neutral one.
//!
use crate::common::emotion::Emotion;

/// A motivational quote and its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub quote: String,
    pub author: String,
}

pub const FALLBACK_QUOTES: &[(&str, &str)] = &[
    ("The only way out is through.", "Robert Frost"),
    ("You are stronger than you think.", "Unknown"),
    ("Every moment is a fresh beginning.", "T.S. Eliot"),
    ("Believe you can and you're halfway there.", "Theodore Roosevelt"),
    ("This too shall pass.", "Persian Proverb"),
];

const SADNESS_TECHNIQUES: &[&str] = &[
    "Practice self-compassion by treating yourself with the same kindness you'd offer to a friend.",
    "Try journaling about your feelings to help process them.",
    "Engage in light physical activity like walking, which can help improve your mood.",
    "Connect with a supportive friend or family member.",
    "Remember that emotions are temporary and will pass with time.",
];

const ANGER_TECHNIQUES: &[&str] = &[
    "Take deep breaths, counting to 10 before responding.",
    "Try the 5-4-3-2-1 grounding technique to calm your nervous system.",
    "Consider the situation from the other person's perspective.",
    "Express your feelings using 'I' statements rather than accusations.",
    "Step away from the situation temporarily if possible to cool down.",
];

const FEAR_TECHNIQUES: &[&str] = &[
    "Practice mindful breathing to center yourself in the present moment.",
    "Challenge catastrophic thinking by examining the evidence for your fears.",
    "Break overwhelming tasks into smaller, manageable steps.",
    "Visualize yourself successfully handling the situation you fear.",
    "Remember past situations where you successfully overcame your fears.",
];

const JOY_TECHNIQUES: &[&str] = &[
    "Savor this positive moment by being fully present in it.",
    "Express gratitude for the good things in your life.",
    "Share your happiness with others to strengthen connections.",
    "Reflect on what contributed to this positive feeling.",
    "Use this positive energy to tackle something challenging.",
];

const NEUTRAL_TECHNIQUES: &[&str] = &[
    "Practice mindfulness to become more aware of your thoughts and feelings.",
    "Set small, achievable goals to create a sense of accomplishment.",
    "Explore activities that have brought you joy in the past.",
    "Consider starting a gratitude practice to notice positive aspects of your life.",
    "Take care of your physical needs like sleep, nutrition, and exercise.",
];

const SADNESS_RESPONSES: &[&str] = &[
    "I hear that you're feeling down right now. That's completely valid, and I'm here to listen.",
    "It sounds like you're going through a difficult time. Remember that it's okay to feel sad sometimes.",
    "I'm sorry you're feeling this way. Would it help to talk more about what's troubling you?",
    "When we feel sad, it can be overwhelming. Let's take it one step at a time together.",
    "I understand that sadness can feel heavy. You don't have to carry that weight alone.",
];

const ANGER_RESPONSES: &[&str] = &[
    "I can sense your frustration. It's completely natural to feel angry sometimes.",
    "Your feelings are valid. Would it help to explore what's behind this anger?",
    "It sounds like this situation has really upset you, and that's understandable.",
    "Anger often comes from feeling unheard or disrespected. I'm here to listen to you.",
    "I appreciate you sharing these strong feelings with me. Let's work through this together.",
];

const FEAR_RESPONSES: &[&str] = &[
    "It's okay to feel anxious or scared. These feelings are trying to protect you.",
    "I hear that you're worried. Would it help to talk about what's causing this fear?",
    "Feeling anxious can be really uncomfortable. You're brave for acknowledging these feelings.",
    "When we're afraid, our minds often focus on the worst possibilities. Let's explore this together.",
    "Your concerns are valid. Let's take a moment to breathe and think about this situation.",
];

const JOY_RESPONSES: &[&str] = &[
    "It's wonderful to hear you're feeling positive! Your happiness is important.",
    "I'm so glad things are going well for you. Would you like to share more about what's bringing you joy?",
    "That sounds really positive! It's great that you're experiencing these good feelings.",
    "I'm happy to hear that! Celebrating these positive moments is important.",
    "Your positive energy is contagious. Thank you for sharing this happy moment.",
];

const NEUTRAL_RESPONSES: &[&str] = &[
    "I'm here to support you, whatever you might be feeling right now.",
    "How are you feeling about everything that's going on?",
    "I'm listening and here to help in any way I can.",
    "Would you like to explore any particular thoughts or feelings today?",
    "Sometimes taking a moment to check in with ourselves can be helpful. How are you really doing?",
];

/// Generic answer when no better reply can be produced.
pub const NOT_SURE_REPLY: &str =
    "I'm not sure how to respond to that. Could you rephrase or ask something else?";

/// Answer when the language-model fallback could not be reached at all.
pub const TROUBLE_REPLY: &str =
    "I'm having trouble processing your request right now. Let's try something else.";

pub fn therapy_techniques(emotion: Emotion) -> &'static [&'static str] {
    match emotion {
        Emotion::Sadness => SADNESS_TECHNIQUES,
        Emotion::Anger => ANGER_TECHNIQUES,
        Emotion::Fear => FEAR_TECHNIQUES,
        Emotion::Joy => JOY_TECHNIQUES,
        _ => NEUTRAL_TECHNIQUES,
    }
}

pub fn empathetic_responses(emotion: Emotion) -> &'static [&'static str] {
    match emotion {
        Emotion::Sadness => SADNESS_RESPONSES,
        Emotion::Anger => ANGER_RESPONSES,
        Emotion::Fear => FEAR_RESPONSES,
        Emotion::Joy => JOY_RESPONSES,
        _ => NEUTRAL_RESPONSES,
    }
}

/// Whether a canned reply for this emotion may carry a coping technique.
pub fn offers_technique(emotion: Emotion) -> bool {
    matches!(emotion, Emotion::Sadness | Emotion::Anger | Emotion::Fear)
}

pub fn quote_prefix(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Sadness => {
            "I understand you might be feeling down. Here's something that might help: "
        }
        Emotion::Anger => "I can sense you're frustrated. Take a deep breath and consider this: ",
        Emotion::Fear => "It's okay to feel anxious sometimes. Remember: ",
        Emotion::Joy => "I'm glad you're feeling positive! Here's more inspiration: ",
        _ => "Here's a thought for you: ",
    }
}

pub fn coping_intro(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Sadness => "When you're feeling down, it can help to:",
        Emotion::Anger => "To manage feelings of frustration or anger, you might try:",
        Emotion::Fear => "When anxiety or fear arises, this technique can be helpful:",
        Emotion::Joy => "To build on these positive feelings, consider:",
        _ => "Here's a helpful technique you might want to try:",
    }
}
