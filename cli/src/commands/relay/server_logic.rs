//! # CogniSentinel Web Relay Implementation
//!
//! File: cli/src/commands/relay/server_logic.rs
//!
//! ## Overview
//!
//! Serves the static chat page and relays each message to the dialogue
//! engine. The browser never sees an engine error: any upstream failure
//! becomes a 503 carrying a fixed apology, and an engine that answers with
//! nothing becomes a 200 carrying a fixed "please rephrase".
//!
//! ## Architecture
//!
//! 1. Bind the configured address (no port fallback; the page is opened at it).
//! 2. Build the router: `/api/chat`, `/api/status`, and `ServeDir` for
//!    everything else (`/` → `index.html`).
//! 3. Layer request tracing, optional permissive CORS and the in-flight limit.
//! 4. Serve until Ctrl+C or SIGTERM.
//!
use super::upstream::{DialogueEngineClient, RelayReply, RelayRequest};
use crate::common::network;
use crate::core::config::RelayConfig;
use crate::core::error::Result;
use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn, Level};

/// Shown when the dialogue engine cannot be reached or fails.
pub const FALLBACK_TEXT: &str =
    "Sorry, the assistant is unavailable right now. Please try again in a moment.";

/// Shown when the engine answers without any text.
pub const NO_REPLY_TEXT: &str =
    "I'm not sure how to respond to that. Could you rephrase or ask something else?";

const DEFAULT_SENDER: &str = "user";

#[derive(Clone)]
pub struct AppState {
    engine: Arc<DialogueEngineClient>,
}

impl AppState {
    pub fn new(engine: DialogueEngineClient) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// # Run Web Relay (`run_server`)
///
/// Binds the relay address, prints where the chat page can be opened and
/// serves until shutdown.
///
/// ## Errors
///
/// `SentinelError::PortInUse` if the port is taken, or any fatal server error.
pub async fn run_server(config: &RelayConfig) -> Result<()> {
    let addr = config.socket_addr();
    let listener = network::bind_listener("Web relay", addr).await?;

    if !config.static_dir.join("index.html").is_file() {
        warn!(
            "No index.html in {}; GET / will return 404.",
            config.static_dir.display()
        );
    }

    let engine = DialogueEngineClient::new(
        network::http_client()?,
        &config.engine_url,
        config.engine_timeout(),
    );
    let app = create_app(config, AppState::new(engine));
    let local_ip = network::get_local_ip().await;

    println!("\n=================================================================");
    println!("📂 Chat page from:     {}", config.static_dir.display());
    println!("🌐 Local URL:          http://localhost:{}", addr.port());
    if local_ip != "localhost" && addr.ip().is_unspecified() {
        println!("🔗 Network URL:        http://{}:{}", local_ip, addr.port());
    }
    println!("🤖 Dialogue engine:    {}", config.engine_url);
    println!("🔒 CORS enabled:       {}", config.enable_cors);
    println!("=================================================================\n");
    info!("Web relay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(network::shutdown_signal())
        .await
        .context("Web relay failed")?;

    info!("Web relay shutdown complete.");
    Ok(())
}

/// # Create Relay Application (`create_app`)
///
/// API routes first, static files as the fallback service.
pub fn create_app(config: &RelayConfig, state: AppState) -> Router {
    let cors_layer = if config.enable_cors {
        info!("CORS middleware enabled (permissive).");
        CorsLayer::permissive()
    } else {
        info!("CORS middleware disabled.");
        CorsLayer::new()
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::default().include_headers(true))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/status", get(status))
        .fallback_service(ServeDir::new(&config.static_dir))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer)
                .layer(cors_layer)
                .layer(GlobalConcurrencyLimitLayer::new(config.max_in_flight)),
        )
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<RelayRequest>,
) -> (StatusCode, Json<RelayReply>) {
    let sender = request
        .sender
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SENDER);

    match state.engine.send(sender, &request.message).await {
        Ok(messages) => {
            let text = messages
                .iter()
                .filter_map(|m| m.text.as_deref())
                .filter(|t| !t.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            let text = if text.is_empty() {
                info!("Dialogue engine produced no text for '{}'", sender);
                NO_REPLY_TEXT.to_string()
            } else {
                text
            };
            (
                StatusCode::OK,
                Json(RelayReply {
                    text,
                    messages,
                    error: None,
                }),
            )
        }
        Err(e) => {
            error!("Relaying message for '{}' failed: {}", sender, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(RelayReply {
                    text: FALLBACK_TEXT.to_string(),
                    messages: Vec::new(),
                    error: Some("service_unavailable"),
                }),
            )
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let engine = if state.engine.probe().await {
        "connected"
    } else {
        "disconnected"
    };
    Json(json!({ "relay": "ok", "engine": engine }))
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    const PAGE: &str = "<html><body>chat</body></html>";

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

    /// Fake engine echoing the message back, or answering nothing for "silence".
    async fn fake_engine() -> String {
        serve(
            Router::new()
                .route(
                    "/webhooks/rest/webhook",
                    post(|Json(body): Json<Value>| async move {
                        let message = body["message"].as_str().unwrap_or_default().to_string();
                        if message == "silence" {
                            return Json(json!([]));
                        }
                        Json(json!([
                            { "recipient_id": body["sender"], "text": format!("You said: {}", message) },
                            { "recipient_id": body["sender"], "text": "I'm here for you." }
                        ]))
                    }),
                )
                .route("/status", get(|| async { Json(json!({ "version": "3.6.0" })) })),
        )
        .await
    }

    async fn spawn_relay(engine_url: String) -> (String, TempDir) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), PAGE).unwrap();
        let config = RelayConfig {
            static_dir: dir.path().to_path_buf(),
            engine_url: engine_url.clone(),
            ..RelayConfig::default()
        };
        let engine =
            DialogueEngineClient::new(reqwest::Client::new(), &engine_url, Duration::from_secs(2));
        let base = serve(create_app(&config, AppState::new(engine))).await;
        (base, dir)
    }

    #[tokio::test]
    async fn test_chat_relays_engine_reply() {
        let (relay, _dir) = spawn_relay(fake_engine().await).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/chat", relay))
            .json(&json!({ "message": "I feel really anxious today" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["text"],
            "You said: I feel really anxious today\nI'm here for you."
        );
        assert_eq!(body["messages"][0]["recipient_id"], "user");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_chat_uses_given_sender() {
        let (relay, _dir) = spawn_relay(fake_engine().await).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/chat", relay))
            .json(&json!({ "message": "hello", "sender": "session-42" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["messages"][0]["recipient_id"], "session-42");
    }

    #[tokio::test]
    async fn test_chat_empty_engine_reply_is_not_empty_text() {
        let (relay, _dir) = spawn_relay(fake_engine().await).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/chat", relay))
            .json(&json!({ "message": "silence" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["text"], NO_REPLY_TEXT);
    }

    #[tokio::test]
    async fn test_chat_engine_unreachable_returns_fallback() {
        let (relay, _dir) = spawn_relay(closed_url().await).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/chat", relay))
            .json(&json!({ "message": "hello?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 503);

        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body,
            json!({ "text": FALLBACK_TEXT, "error": "service_unavailable" })
        );
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_body() {
        let (relay, _dir) = spawn_relay(fake_engine().await).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/chat", relay))
            .json(&json!({ "text": "wrong field" }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_index_page_is_stable() {
        let (relay, _dir) = spawn_relay(closed_url().await).await;
        let client = reqwest::Client::new();

        let first = client.get(format!("{}/", relay)).send().await.unwrap();
        assert_eq!(first.status(), 200);
        let first = first.text().await.unwrap();
        let second = client
            .get(format!("{}/", relay))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert_eq!(first, PAGE);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_status_reports_engine_state() {
        let (online, _a) = spawn_relay(fake_engine().await).await;
        let body: Value = reqwest::get(format!("{}/api/status", online))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({ "relay": "ok", "engine": "connected" }));

        let (offline, _b) = spawn_relay(closed_url().await).await;
        let body: Value = reqwest::get(format!("{}/api/status", offline))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["engine"], "disconnected");
    }
}
