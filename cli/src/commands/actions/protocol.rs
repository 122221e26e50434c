//! # Action Callback Wire Types
//!
//! File: cli/src/commands/actions/protocol.rs
//!
//! ## Overview
//!
//! Request and response bodies of the dialogue engine's action-callback
//! protocol. The engine POSTs an `ActionCall` to `/webhook` naming the action
//! to run together with the conversation tracker; the server answers with the
//! events to apply (slot updates) and the messages to utter.
//!
//! Only the parts of the tracker the handlers read are modelled. Everything
//! else in the payload is accepted and ignored.
//!
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Body of `POST /webhook`.
#[derive(Deserialize, Debug, Clone)]
pub struct ActionCall {
    pub next_action: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Tracker {
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub slots: HashMap<String, Value>,
    #[serde(default)]
    pub latest_message: LatestMessage,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LatestMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub intent: IntentInfo,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct IntentInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

impl Tracker {
    /// Text of the latest user message, or `""`.
    pub fn latest_text(&self) -> &str {
        self.latest_message.text.as_deref().unwrap_or("")
    }

    pub fn intent_name(&self) -> &str {
        self.latest_message.intent.name.as_deref().unwrap_or("")
    }

    pub fn intent_confidence(&self) -> f64 {
        self.latest_message.intent.confidence
    }

    /// String value of a slot; `None` when unset, null or not a string.
    pub fn slot_str(&self, name: &str) -> Option<&str> {
        self.slots.get(name).and_then(Value::as_str)
    }
}

/// Tracker events returned to the engine.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event")]
pub enum Event {
    #[serde(rename = "slot")]
    SlotSet { name: String, value: Value },
}

impl Event {
    pub fn slot(name: &str, value: impl Into<Value>) -> Self {
        Event::SlotSet {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// A message for the engine to utter.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BotResponse {
    pub text: String,
}

/// Body returned for a successful action run.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ActionResponse {
    pub events: Vec<Event>,
    pub responses: Vec<BotResponse>,
}

/// Body returned when the requested action is not registered.
#[derive(Serialize, Debug, Clone)]
pub struct ActionErrorBody {
    pub error: String,
    pub action_name: String,
}

impl ActionErrorBody {
    pub fn not_found(action_name: &str) -> Self {
        Self {
            error: format!("No registered action found for name '{}'.", action_name),
            action_name: action_name.to_string(),
        }
    }
}

/// Collects the messages an action wants to send.
#[derive(Debug, Default)]
pub struct Dispatcher {
    messages: Vec<BotResponse>,
}

impl Dispatcher {
    pub fn utter_message(&mut self, text: impl Into<String>) {
        self.messages.push(BotResponse { text: text.into() });
    }

    pub fn into_response(self, events: Vec<Event>) -> ActionResponse {
        ActionResponse {
            events,
            responses: self.messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_engine_payload_ignores_unknown_fields() {
        let payload = json!({
            "next_action": "action_process_message",
            "sender_id": "abc",
            "version": "3.6.0",
            "domain": { "intents": ["greet"] },
            "tracker": {
                "sender_id": "abc",
                "slots": { "detected_emotion": "sadness", "server_connection_status": null },
                "latest_message": {
                    "text": "I feel low",
                    "intent": { "name": "express_sadness", "confidence": 0.87 },
                    "entities": []
                },
                "events": [],
                "paused": false
            }
        });

        let call: ActionCall = serde_json::from_value(payload).unwrap();

        assert_eq!(call.next_action, "action_process_message");
        assert_eq!(call.tracker.latest_text(), "I feel low");
        assert_eq!(call.tracker.intent_name(), "express_sadness");
        assert!((call.tracker.intent_confidence() - 0.87).abs() < 1e-9);
        assert_eq!(call.tracker.slot_str("detected_emotion"), Some("sadness"));
        assert_eq!(call.tracker.slot_str("server_connection_status"), None);
    }

    #[test]
    fn test_minimal_payload_defaults() {
        let call: ActionCall =
            serde_json::from_value(json!({ "next_action": "action_fallback_api" })).unwrap();
        assert_eq!(call.tracker.latest_text(), "");
        assert_eq!(call.tracker.intent_confidence(), 0.0);
    }

    #[test]
    fn test_response_serialization_shape() {
        let mut dispatcher = Dispatcher::default();
        dispatcher.utter_message("Hello there");
        let response = dispatcher.into_response(vec![Event::slot("detected_emotion", "joy")]);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "events": [{ "event": "slot", "name": "detected_emotion", "value": "joy" }],
                "responses": [{ "text": "Hello there" }]
            })
        );
    }
}
