//! HTTP surface for Converse.
//!
//! Thin axum routes delegating to the core: connect, chat, and a health
//! probe. The routes do no work of their own beyond status-code mapping.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::chat::Orchestrator;
use crate::config::{Config, ConnectionProfile};
use crate::db::{ClientFactory, Connector, MySqlFactory};
use crate::error::ConverseError;
use crate::llm::{GeminiClient, GeminiConfig, LlmClient};
use crate::session::SessionState;

/// Shared application state behind the routes.
pub struct AppState {
    /// Profile + schema from the last successful connect.
    pub session: SessionState,
    /// Bounded connect/introspect worker.
    pub connector: Connector,
    /// Text-to-SQL orchestrator.
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Builds the state from configuration, wiring the MySQL factory into
    /// both the connector and the orchestrator.
    pub fn from_config(config: &Config) -> Self {
        let llm: Option<Arc<dyn LlmClient>> = match &config.llm.api_key {
            Some(api_key) => match GeminiClient::new(GeminiConfig::new(api_key.clone())) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::error!("Failed to initialize Gemini client: {e}");
                    None
                }
            },
            None => {
                tracing::warn!("No API key configured; chat will report the client as not ready");
                None
            }
        };

        let factory: Arc<dyn ClientFactory> = Arc::new(MySqlFactory);
        Self::new(llm, factory, config.llm.candidates())
    }

    /// Builds the state from explicit collaborators (used by tests).
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        factory: Arc<dyn ClientFactory>,
        candidates: Vec<String>,
    ) -> Self {
        Self {
            session: SessionState::new(),
            connector: Connector::new(Arc::clone(&factory)),
            orchestrator: Orchestrator::new(llm, factory, candidates),
        }
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/connect", post(connect))
        .route("/api/chat", post(chat))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health, a liveness probe.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Request body for /api/connect.
#[derive(Debug, Deserialize)]
struct ConnectRequest {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    user: String,
    password: String,
    database: String,
}

fn default_port() -> u16 {
    3306
}

impl ConnectRequest {
    fn into_profile(self) -> ConnectionProfile {
        ConnectionProfile {
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password,
            database: self.database,
        }
    }
}

/// POST /api/connect: connect, introspect, and store the session.
async fn connect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConnectRequest>,
) -> (StatusCode, Json<Value>) {
    let profile = request.into_profile().normalized();
    info!("Connecting to {}...", profile.display_string());

    match state.connector.connect(&profile).await {
        Ok(schema) => {
            state.session.replace(profile, schema).await;
            (StatusCode::OK, Json(json!({ "success": true })))
        }
        Err(e @ ConverseError::ConnectTimeout) => (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({ "success": false, "error": e.to_string() })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": e.to_string() })),
        ),
    }
}

/// Request body for /api/chat.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    query: String,
}

/// POST /api/chat: answer one natural-language question.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(active) = state.session.snapshot().await else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Database not connected" })),
        );
    };

    let result = state
        .orchestrator
        .answer(&request.query, &active.schema, &active.profile)
        .await;

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let body = serde_json::to_value(&result)
        .unwrap_or_else(|_| json!({ "success": false, "error": "serialization failure" }));

    (status, Json(body))
}
