//! # Custom Action Server Implementation
//!
//! File: cli/src/commands/actions/server_logic.rs
//!
//! ## Overview
//!
//! HTTP side of `cognisentinel actions`. The dialogue engine POSTs to
//! `/webhook` naming the action to run; the registry dispatches it and the
//! resulting events and messages go back as JSON.
//!
//! | Method | Path       | Purpose                               |
//! |--------|------------|---------------------------------------|
//! | POST   | `/webhook` | run `next_action`, 404 if unknown     |
//! | GET    | `/health`  | liveness for the launcher and humans  |
//! | GET    | `/actions` | names of the registered actions       |
//!
//! Requests are handled concurrently up to `max_in_flight`. Every request gets
//! its own freshly seeded RNG, so handlers share nothing mutable.
//!
use super::handlers::{ActionContext, ActionRegistry};
use super::protocol::{ActionCall, ActionErrorBody};
use crate::common::network;
use crate::core::config::ActionsConfig;
use crate::core::error::Result;
use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

#[derive(Clone)]
pub struct AppState {
    registry: Arc<ActionRegistry>,
    context: Arc<ActionContext>,
}

impl AppState {
    pub fn new(context: ActionContext) -> Self {
        Self {
            registry: Arc::new(ActionRegistry::new()),
            context: Arc::new(context),
        }
    }
}

/// # Run Action Server (`run_server`)
///
/// Binds the configured address (no fallback port: the engine's endpoints
/// file points at it) and serves until Ctrl+C or SIGTERM.
///
/// ## Errors
///
/// `SentinelError::PortInUse` if the port is taken, or any fatal server error.
pub async fn run_server(config: &ActionsConfig) -> Result<()> {
    let addr = config.socket_addr();
    let listener = network::bind_listener("Action server", addr).await?;

    let http = network::http_client()?;
    let state = AppState::new(ActionContext::new(config, http));
    let app = create_app(state, config.max_in_flight);

    println!("\n=================================================================");
    println!("🧩 Action server:     http://{}/webhook", network::connect_addr(addr));
    println!("🤖 Dialogue engine:   {}", config.engine_url);
    println!(
        "🏷️  Emotion tagging:   {}",
        config.tagger_url.as_deref().unwrap_or("keywords")
    );
    println!(
        "💬 Language model:    {}",
        if config.llm_api_key.is_some() {
            config.llm_model.as_str()
        } else {
            "disabled (no API key)"
        }
    );
    println!("=================================================================\n");
    info!("Action server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(network::shutdown_signal())
        .await
        .context("Action server failed")?;

    info!("Action server shutdown complete.");
    Ok(())
}

/// Builds the router with tracing and the in-flight request limit.
pub fn create_app(state: AppState, max_in_flight: usize) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::default())
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/webhook", post(run_action))
        .route("/health", get(health))
        .route("/actions", get(list_actions))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer)
                .layer(GlobalConcurrencyLimitLayer::new(max_in_flight)),
        )
}

async fn run_action(State(state): State<AppState>, Json(call): Json<ActionCall>) -> Response {
    info!(
        "Received call for {} (sender: {}, engine version: {})",
        call.next_action,
        call.sender_id
            .as_deref()
            .or(call.tracker.sender_id.as_deref())
            .unwrap_or("unknown"),
        call.version.as_deref().unwrap_or("unknown")
    );

    let mut rng = StdRng::from_entropy();
    match state.registry.execute(&call, &state.context, &mut rng).await {
        Some(response) => Json(response).into_response(),
        None => {
            warn!("No registered action found for name '{}'", call.next_action);
            (
                StatusCode::NOT_FOUND,
                Json(ActionErrorBody::not_found(&call.next_action)),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_actions(State(state): State<AppState>) -> Json<Value> {
    let names: Vec<Value> = state
        .registry
        .names()
        .into_iter()
        .map(|name| json!({ "name": name }))
        .collect();
    Json(Value::Array(names))
}
