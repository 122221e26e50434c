//! # Custom Action Handlers
//!
//! File: cli/src/commands/actions/handlers.rs
//!
//! ## Overview
//!
//! The actions the dialogue engine calls back into. Each one reads the tracker
//! it is given, optionally tags the latest utterance with an emotion, and
//! answers with messages to utter plus slot events. Handlers hold no state of
//! their own; everything they share (HTTP client, tagger, language model)
//! lives in the read-only `ActionContext`.
//!
//! ## Architecture
//!
//! - `CustomAction`: async trait with a stable `name()` the engine refers to.
//! - `ActionRegistry`: the fixed set of registered actions, looked up by name.
//! - `ActionContext`: collaborators and tunables built once from configuration.
//!
//! Random choices (which canned reply, whether to add a technique, whether to
//! ask the language model) go through an injected `StdRng` so tests can seed it.
//!
use super::catalog::{self, Quote};
use super::llm::{self, SupportModel};
use super::protocol::{ActionCall, ActionResponse, Dispatcher, Event};
use crate::common::emotion::{self, Emotion, EmotionTagger};
use crate::common::network;
use crate::core::config::ActionsConfig;
use crate::core::error::SentinelError;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DETECTED_EMOTION_SLOT: &str = "detected_emotion";
pub const SERVER_STATUS_SLOT: &str = "server_connection_status";

const QUOTE_TIMEOUT: Duration = Duration::from_secs(3);
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Probabilities steering the supportive-reply path.
#[derive(Debug, Clone, Copy)]
pub struct ReplyOdds {
    /// Chance of answering with a canned reply instead of asking the model.
    pub canned: f64,
    /// Chance of appending a coping technique to a canned reply.
    pub technique: f64,
}

impl Default for ReplyOdds {
    fn default() -> Self {
        Self {
            canned: 0.7,
            technique: 0.5,
        }
    }
}

/// Shared, read-only collaborators of the action handlers.
pub struct ActionContext {
    pub tagger: Arc<dyn EmotionTagger>,
    pub http: reqwest::Client,
    pub quote_url: Option<String>,
    pub engine_status_url: String,
    pub llm: SupportModel,
    pub low_confidence_threshold: f64,
    pub odds: ReplyOdds,
}

impl ActionContext {
    pub fn new(config: &ActionsConfig, http: reqwest::Client) -> Self {
        Self {
            tagger: emotion::build_tagger(config, http.clone()),
            quote_url: config.quote_url.clone(),
            engine_status_url: network::join_url(&config.engine_url, "status"),
            llm: SupportModel::new(http.clone(), config),
            low_confidence_threshold: config.low_confidence_threshold,
            odds: ReplyOdds::default(),
            http,
        }
    }

    /// Fetches a quote from the configured quote service, if any.
    async fn fetch_quote(&self) -> Option<Quote> {
        #[derive(Deserialize)]
        struct QuotePayload {
            quote: Option<String>,
            author: Option<String>,
        }

        let url = self.quote_url.as_deref()?;
        let response = match self.http.get(url).timeout(QUOTE_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Error fetching quote from {}: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("Quote service returned {}, using fallback quote", response.status());
            return None;
        }
        match response.json::<QuotePayload>().await {
            Ok(QuotePayload {
                quote: Some(quote),
                author: Some(author),
            }) => Some(Quote { quote, author }),
            Ok(_) => {
                warn!("Quote service reply is missing quote or author, using fallback quote");
                None
            }
            Err(e) => {
                warn!("Quote service reply could not be parsed: {}", e);
                None
            }
        }
    }
}

/// A named callback the dialogue engine can invoke.
#[async_trait]
pub trait CustomAction: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs the action, uttering through `dispatcher` and returning events.
    async fn run(
        &self,
        call: &ActionCall,
        ctx: &ActionContext,
        dispatcher: &mut Dispatcher,
        rng: &mut StdRng,
    ) -> Vec<Event>;
}

fn pick<'a>(items: &[&'a str], rng: &mut StdRng) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn fallback_quote(rng: &mut StdRng) -> Quote {
    let (quote, author) = catalog::FALLBACK_QUOTES
        .choose(rng)
        .copied()
        .unwrap_or(("This too shall pass.", "Persian Proverb"));
    Quote {
        quote: quote.to_string(),
        author: author.to_string(),
    }
}

/// A canned empathetic reply, optionally followed by a coping technique.
fn canned_reply(emotion: Emotion, offer_technique: bool, odds: ReplyOdds, rng: &mut StdRng) -> String {
    let mut reply = pick(catalog::empathetic_responses(emotion), rng).to_string();
    if offer_technique && catalog::offers_technique(emotion) && rng.gen_bool(odds.technique) {
        let technique = pick(catalog::therapy_techniques(emotion), rng);
        reply.push_str("\n\nHere's a technique that might help: ");
        reply.push_str(technique);
    }
    reply
}

async fn tag_latest(call: &ActionCall, ctx: &ActionContext) -> Emotion {
    let text = call.tracker.latest_text();
    let reading = ctx.tagger.tag(text).await;
    info!(
        "Detected emotion: {} (confidence: {:.2}, method: {})",
        reading.emotion, reading.confidence, reading.method
    );
    reading.emotion
}

/// Answers with a motivational quote introduced according to the user's mood.
pub struct MotivationalQuote;

#[async_trait]
impl CustomAction for MotivationalQuote {
    fn name(&self) -> &'static str {
        "action_get_motivational_quote"
    }

    async fn run(
        &self,
        call: &ActionCall,
        ctx: &ActionContext,
        dispatcher: &mut Dispatcher,
        rng: &mut StdRng,
    ) -> Vec<Event> {
        let emotion = tag_latest(call, ctx).await;
        let quote = match ctx.fetch_quote().await {
            Some(quote) => quote,
            None => fallback_quote(rng),
        };

        dispatcher.utter_message(format!(
            "{}\n\"{}\"\n- {}",
            catalog::quote_prefix(emotion),
            quote.quote,
            quote.author
        ));
        vec![Event::slot(DETECTED_EMOTION_SLOT, emotion.as_str())]
    }
}

/// Records the user's emotion, and steps in with a supportive reply when the
/// engine was unsure which intent it heard.
pub struct ProcessMessage;

#[async_trait]
impl CustomAction for ProcessMessage {
    fn name(&self) -> &'static str {
        "action_process_message"
    }

    async fn run(
        &self,
        call: &ActionCall,
        ctx: &ActionContext,
        dispatcher: &mut Dispatcher,
        rng: &mut StdRng,
    ) -> Vec<Event> {
        let text = call.tracker.latest_text();
        let confidence = call.tracker.intent_confidence();
        info!(
            "Intent: {} (confidence: {:.2})",
            call.tracker.intent_name(),
            confidence
        );
        let emotion = tag_latest(call, ctx).await;

        if confidence < ctx.low_confidence_threshold {
            let reply = if rng.gen_bool(ctx.odds.canned) {
                canned_reply(emotion, true, ctx.odds, rng)
            } else {
                let prompt = llm::system_prompt(Some(emotion.as_str()));
                match ctx.llm.reply(&prompt, text).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!("Language model fallback failed: {}, using canned reply", e);
                        pick(catalog::empathetic_responses(emotion), rng).to_string()
                    }
                }
            };
            dispatcher.utter_message(reply);
        }

        vec![Event::slot(DETECTED_EMOTION_SLOT, emotion.as_str())]
    }
}

/// Last-resort answer for messages the engine could not classify.
pub struct FallbackApi;

#[async_trait]
impl CustomAction for FallbackApi {
    fn name(&self) -> &'static str {
        "action_fallback_api"
    }

    async fn run(
        &self,
        call: &ActionCall,
        ctx: &ActionContext,
        dispatcher: &mut Dispatcher,
        rng: &mut StdRng,
    ) -> Vec<Event> {
        let emotion = tag_latest(call, ctx).await;

        let reply = if rng.gen_bool(ctx.odds.canned) {
            canned_reply(emotion, false, ctx.odds, rng)
        } else {
            match ctx
                .llm
                .reply(&llm::system_prompt(None), call.tracker.latest_text())
                .await
            {
                Ok(reply) => reply,
                Err(
                    e @ (SentinelError::Upstream { .. } | SentinelError::UpstreamReply { .. }),
                ) => {
                    warn!("Error in language model fallback: {}", e);
                    catalog::TROUBLE_REPLY.to_string()
                }
                Err(e) => {
                    warn!("Language model fallback unavailable: {}", e);
                    catalog::NOT_SURE_REPLY.to_string()
                }
            }
        };
        dispatcher.utter_message(reply);

        vec![Event::slot(DETECTED_EMOTION_SLOT, emotion.as_str())]
    }
}

/// Records whether the dialogue engine answers its status endpoint.
pub struct CheckServerStatus;

#[async_trait]
impl CustomAction for CheckServerStatus {
    fn name(&self) -> &'static str {
        "action_check_server_status"
    }

    async fn run(
        &self,
        _call: &ActionCall,
        ctx: &ActionContext,
        _dispatcher: &mut Dispatcher,
        _rng: &mut StdRng,
    ) -> Vec<Event> {
        let connected =
            network::probe_status(&ctx.http, &ctx.engine_status_url, STATUS_TIMEOUT).await;
        let status = if connected { "connected" } else { "disconnected" };
        info!("Dialogue engine connection: {}", status);
        vec![Event::slot(SERVER_STATUS_SLOT, status)]
    }
}

/// Suggests a coping technique for the emotion stored in `detected_emotion`.
pub struct SuggestCopingStrategy;

#[async_trait]
impl CustomAction for SuggestCopingStrategy {
    fn name(&self) -> &'static str {
        "action_suggest_coping_strategy"
    }

    async fn run(
        &self,
        call: &ActionCall,
        _ctx: &ActionContext,
        dispatcher: &mut Dispatcher,
        rng: &mut StdRng,
    ) -> Vec<Event> {
        let emotion = Emotion::from_label(
            call.tracker
                .slot_str(DETECTED_EMOTION_SLOT)
                .unwrap_or("neutral"),
        );
        let technique = pick(catalog::therapy_techniques(emotion), rng);
        debug!("Suggesting coping technique for {}", emotion);

        dispatcher.utter_message(format!("{}\n\n{}", catalog::coping_intro(emotion), technique));
        Vec::new()
    }
}

/// The actions served by the action server.
pub struct ActionRegistry {
    actions: Vec<Arc<dyn CustomAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        let actions: Vec<Arc<dyn CustomAction>> = vec![
            Arc::new(MotivationalQuote),
            Arc::new(ProcessMessage),
            Arc::new(FallbackApi),
            Arc::new(CheckServerStatus),
            Arc::new(SuggestCopingStrategy),
        ];
        Self { actions }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Runs the action named by `call.next_action`; `None` if it is unknown.
    pub async fn execute(
        &self,
        call: &ActionCall,
        ctx: &ActionContext,
        rng: &mut StdRng,
    ) -> Option<ActionResponse> {
        let action = self.actions.iter().find(|a| a.name() == call.next_action)?;
        let mut dispatcher = Dispatcher::default();
        let events = action.run(call, ctx, &mut dispatcher, rng).await;
        Some(dispatcher.into_response(events))
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Names of every registered action, as the model store must declare them.
pub fn registered_action_names() -> Vec<&'static str> {
    ActionRegistry::new().names()
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::actions::protocol::BotResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use rand::SeedableRng;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn closed_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    async fn context(config: ActionsConfig) -> ActionContext {
        ActionContext::new(&config, reqwest::Client::new())
    }

    async fn offline_config() -> ActionsConfig {
        ActionsConfig {
            engine_url: closed_url().await,
            ..ActionsConfig::default()
        }
    }

    fn call(action: &str, text: &str, confidence: f64, slots: Value) -> ActionCall {
        serde_json::from_value(json!({
            "next_action": action,
            "sender_id": "test",
            "tracker": {
                "slots": slots,
                "latest_message": {
                    "text": text,
                    "intent": { "name": "some_intent", "confidence": confidence }
                }
            }
        }))
        .unwrap()
    }

    fn only_text(response: &ActionResponse) -> &str {
        assert_eq!(response.responses.len(), 1, "{:?}", response);
        &response.responses[0].text
    }

    async fn run(ctx: &ActionContext, call: &ActionCall, seed: u64) -> ActionResponse {
        let mut rng = StdRng::seed_from_u64(seed);
        ActionRegistry::new()
            .execute(call, ctx, &mut rng)
            .await
            .expect("action should be registered")
    }

    #[test]
    fn test_registered_names() {
        assert_eq!(
            registered_action_names(),
            vec![
                "action_get_motivational_quote",
                "action_process_message",
                "action_fallback_api",
                "action_check_server_status",
                "action_suggest_coping_strategy",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_action_is_none() {
        let ctx = context(offline_config().await).await;
        let mut rng = StdRng::seed_from_u64(1);
        let result = ActionRegistry::new()
            .execute(&call("action_does_not_exist", "hi", 0.9, json!({})), &ctx, &mut rng)
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_coping_strategy_uses_slot_and_aliases() {
        let ctx = context(offline_config().await).await;

        let response = run(
            &ctx,
            &call("action_suggest_coping_strategy", "help", 0.9, json!({ "detected_emotion": "sad" })),
            7,
        )
        .await;
        let text = only_text(&response);
        let (intro, technique) = text.split_once("\n\n").unwrap();
        assert_eq!(intro, "When you're feeling down, it can help to:");
        assert!(catalog::therapy_techniques(Emotion::Sadness).contains(&technique));
        assert!(response.events.is_empty());
    }

    #[tokio::test]
    async fn test_coping_strategy_defaults_to_neutral() {
        let ctx = context(offline_config().await).await;

        for slots in [json!({}), json!({ "detected_emotion": null }), json!({ "detected_emotion": "disgust" })] {
            let response =
                run(&ctx, &call("action_suggest_coping_strategy", "", 0.9, slots), 3).await;
            let (intro, technique) = only_text(&response).split_once("\n\n").unwrap();
            assert_eq!(intro, "Here's a helpful technique you might want to try:");
            assert!(catalog::therapy_techniques(Emotion::Neutral).contains(&technique));
        }
    }

    #[tokio::test]
    async fn test_motivational_quote_falls_back_without_service() {
        let ctx = context(offline_config().await).await;
        let response = run(
            &ctx,
            &call("action_get_motivational_quote", "I feel so sad and down today", 0.9, json!({})),
            11,
        )
        .await;

        let text = only_text(&response);
        assert!(text.starts_with(
            "I understand you might be feeling down. Here's something that might help: \n\""
        ));
        assert!(catalog::FALLBACK_QUOTES
            .iter()
            .any(|(quote, author)| text.ends_with(&format!("\"{}\"\n- {}", quote, author))));
        assert_eq!(response.events, vec![Event::slot(DETECTED_EMOTION_SLOT, "sadness")]);
    }

    #[tokio::test]
    async fn test_motivational_quote_from_service() {
        let quotes = serve(Router::new().route(
            "/quote",
            get(|| async { Json(json!({ "quote": "Keep going.", "author": "Someone" })) }),
        ))
        .await;
        let ctx = context(ActionsConfig {
            quote_url: Some(format!("{}/quote", quotes)),
            ..offline_config().await
        })
        .await;

        let response =
            run(&ctx, &call("action_get_motivational_quote", "hello", 0.9, json!({})), 5).await;
        assert_eq!(
            only_text(&response),
            "Here's a thought for you: \n\"Keep going.\"\n- Someone"
        );
    }

    #[tokio::test]
    async fn test_process_message_confident_intent_only_sets_slot() {
        let ctx = context(offline_config().await).await;
        let response = run(
            &ctx,
            &call("action_process_message", "I am so happy today!", 0.95, json!({})),
            2,
        )
        .await;

        assert!(response.responses.is_empty());
        assert_eq!(response.events, vec![Event::slot(DETECTED_EMOTION_SLOT, "joy")]);
    }

    #[tokio::test]
    async fn test_process_message_low_confidence_canned_with_technique() {
        let mut ctx = context(offline_config().await).await;
        ctx.odds = ReplyOdds {
            canned: 1.0,
            technique: 1.0,
        };

        let response = run(
            &ctx,
            &call("action_process_message", "I'm worried and scared", 0.1, json!({})),
            9,
        )
        .await;

        let text = only_text(&response);
        let (reply, technique) = text
            .split_once("\n\nHere's a technique that might help: ")
            .unwrap();
        assert!(catalog::empathetic_responses(Emotion::Fear).contains(&reply));
        assert!(catalog::therapy_techniques(Emotion::Fear).contains(&technique));
        assert_eq!(response.events, vec![Event::slot(DETECTED_EMOTION_SLOT, "fear")]);
    }

    #[tokio::test]
    async fn test_process_message_model_failure_uses_canned_reply() {
        let mut ctx = context(offline_config().await).await;
        ctx.odds.canned = 0.0;

        let response = run(
            &ctx,
            &call("action_process_message", "I feel angry and frustrated", 0.05, json!({})),
            4,
        )
        .await;
        assert!(catalog::empathetic_responses(Emotion::Anger).contains(&only_text(&response)));
    }

    #[tokio::test]
    async fn test_fallback_api_without_key_is_not_sure() {
        let mut ctx = context(offline_config().await).await;
        ctx.odds.canned = 0.0;

        let response =
            run(&ctx, &call("action_fallback_api", "blorp", 0.0, json!({})), 8).await;
        assert_eq!(only_text(&response), catalog::NOT_SURE_REPLY);
        assert_eq!(response.events, vec![Event::slot(DETECTED_EMOTION_SLOT, "neutral")]);
    }

    #[tokio::test]
    async fn test_fallback_api_unreachable_model_is_trouble() {
        let mut ctx = context(ActionsConfig {
            llm_url: format!("{}/v1/chat/completions", closed_url().await),
            llm_api_key: Some("k".into()),
            ..offline_config().await
        })
        .await;
        ctx.odds.canned = 0.0;

        let response =
            run(&ctx, &call("action_fallback_api", "blorp", 0.0, json!({})), 8).await;
        assert_eq!(only_text(&response), catalog::TROUBLE_REPLY);
    }

    #[tokio::test]
    async fn test_fallback_api_unreadable_model_body_is_trouble() {
        let model = serve(Router::new().route(
            "/v1/chat/completions",
            post(|| async { "<html>gateway hiccup</html>" }),
        ))
        .await;
        let mut ctx = context(ActionsConfig {
            llm_url: format!("{}/v1/chat/completions", model),
            llm_api_key: Some("k".into()),
            ..offline_config().await
        })
        .await;
        ctx.odds.canned = 0.0;

        let response =
            run(&ctx, &call("action_fallback_api", "blorp", 0.0, json!({})), 8).await;
        assert_eq!(only_text(&response), catalog::TROUBLE_REPLY);
    }

    #[tokio::test]
    async fn test_fallback_api_model_reply() {
        let model = serve(Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                Json(json!({ "choices": [{ "message": { "content": "That sounds hard." } }] }))
            }),
        ))
        .await;
        let mut ctx = context(ActionsConfig {
            llm_url: format!("{}/v1/chat/completions", model),
            llm_api_key: Some("k".into()),
            ..offline_config().await
        })
        .await;
        ctx.odds.canned = 0.0;

        let response =
            run(&ctx, &call("action_fallback_api", "everything is weird", 0.0, json!({})), 1)
                .await;
        assert_eq!(
            response.responses,
            vec![BotResponse {
                text: "That sounds hard.".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_check_server_status() {
        let offline = context(offline_config().await).await;
        let response = run(&offline, &call("action_check_server_status", "", 0.9, json!({})), 1).await;
        assert_eq!(
            response.events,
            vec![Event::slot(SERVER_STATUS_SLOT, "disconnected")]
        );

        let engine = serve(Router::new().route(
            "/status",
            get(|| async { Json(json!({ "version": "3.6.0" })) }),
        ))
        .await;
        let online = context(ActionsConfig {
            engine_url: engine,
            ..ActionsConfig::default()
        })
        .await;
        let response = run(&online, &call("action_check_server_status", "", 0.9, json!({})), 1).await;
        assert_eq!(response.events, vec![Event::slot(SERVER_STATUS_SLOT, "connected")]);
        assert!(response.responses.is_empty());
    }
}
