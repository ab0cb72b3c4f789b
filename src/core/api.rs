//! HTTP API for journey stage inference
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /config - Loaded questionnaire and fingerprint
//! - POST /chat - Conversational turn through the annotator
//! - POST /users/:id/signals - Submit raw signals directly
//! - GET /users/:id/state - Stored user state

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::annotation::{build_messages, parse_annotator_reply, Annotator, EchoAnnotator, EMPTY_REPLY_FALLBACK};
use crate::core::store::{InMemoryStore, StateStore, StoreError};
use crate::core::turn::{TurnProcessor, TurnResult};
use crate::types::{
    ConfidenceLabel, QuestionnaireConfig, SignalMap, StageProbabilities, TurnOutcome, UserState,
};
use crate::{DEFAULT_HISTORY_WINDOW, DEFAULT_STATE_TTL_SECS};

/// Shared server state
pub struct AppState {
    pub processor: TurnProcessor,
    pub store: Arc<dyn StateStore>,
    pub annotator: Arc<dyn Annotator>,
    pub history_window: usize,
    /// Serializes load → process → save per user
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(
        config: Arc<QuestionnaireConfig>,
        store: Arc<dyn StateStore>,
        annotator: Arc<dyn Annotator>,
        history_window: usize,
    ) -> Self {
        Self {
            processor: TurnProcessor::new(config),
            store,
            annotator,
            history_window,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// In-memory store, echo annotator, default window
    pub fn in_memory(config: Arc<QuestionnaireConfig>) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryStore::new(Duration::from_secs(DEFAULT_STATE_TTL_SECS))),
            Arc::new(EchoAnnotator),
            DEFAULT_HISTORY_WINDOW,
        )
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        // Drop locks nobody is holding any more.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(user_id.to_string()).or_default().clone()
    }

    /// Read a user's state without racing an in-flight turn
    async fn load_state(&self, user_id: &str) -> Result<Option<UserState>, ApiError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        Ok(self.store.load(user_id).await?)
    }

    /// Load, apply, save for one user while holding that user's lock
    async fn apply_turn<F>(&self, user_id: &str, apply: F) -> Result<TurnResult, ApiError>
    where
        F: FnOnce(Option<UserState>) -> TurnResult,
    {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let state = self.store.load(user_id).await?;
        let result = apply(state);
        self.store.save(user_id, &result.state).await?;

        info!(
            user_id,
            reason = result.outcome.reason.code(),
            confidence = %result.outcome.confidence,
            coverage = result.outcome.coverage,
            "turn processed"
        );
        Ok(result)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("no state stored for user `{0}`")]
    NotFound(String),
    #[error("state store failure: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(ref err) => {
                warn!(error = %err, "state store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub config_version: String,
    pub config_fingerprint: String,
}

/// Questionnaire response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config_fingerprint: String,
    pub questionnaire: QuestionnaireConfig,
}

/// Chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    /// Recent turns as `{role, content}`; malformed entries are ignored
    #[serde(default)]
    pub history: Vec<Value>,
}

/// Chat response
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub assistant_message: String,
    pub stage_probs: StageProbabilities,
    pub confidence: ConfidenceLabel,
    pub coverage: f64,
    pub signals: SignalMap,
    pub config_version: String,
    pub config_fingerprint: String,
}

impl ChatResponse {
    fn new(assistant_message: String, outcome: TurnOutcome) -> Self {
        Self {
            assistant_message,
            stage_probs: outcome.stage_probs,
            confidence: outcome.confidence,
            coverage: outcome.coverage,
            signals: outcome.signals,
            config_version: outcome.config_version,
            config_fingerprint: outcome.config_fingerprint,
        }
    }
}

/// Direct signal submission
#[derive(Debug, Deserialize)]
pub struct SignalsRequest {
    #[serde(default)]
    pub signals: Value,
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(get_config))
        .route("/chat", post(chat))
        .route("/users/:id/signals", post(submit_signals))
        .route("/users/:id/state", get(get_state))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let manager = state.processor.manager();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        config_version: manager.config().version.clone(),
        config_fingerprint: manager.fingerprint().to_string(),
    })
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let manager = state.processor.manager();
    Json(ConfigResponse {
        config_fingerprint: manager.fingerprint().to_string(),
        questionnaire: manager.config().clone(),
    })
}

/// One conversational turn
///
/// Annotator failures never fail the request: the turn is treated as
/// carrying no signals.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    // Ids are used verbatim, matching the `/users/:id` routes
    let user_id = req.user_id.as_str();
    if user_id.trim().is_empty() {
        return Err(ApiError::Validation("user_id must not be empty"));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::Validation("message must not be empty"));
    }

    let messages = build_messages(
        state.processor.config(),
        &req.history,
        &req.message,
        state.history_window,
    );
    let reply = match state.annotator.annotate(&messages).await {
        Ok(raw) => Some(parse_annotator_reply(&raw)),
        Err(err) => {
            warn!(user_id, error = %err, "annotation failed, continuing without signals");
            None
        }
    };

    let (assistant_message, result) = match reply {
        Some(reply) => {
            let result = state
                .apply_turn(user_id, |s| state.processor.process(s, &reply.signals))
                .await?;
            (reply.assistant_message, result)
        }
        None => {
            let result = state
                .apply_turn(user_id, |s| state.processor.process_failed(s))
                .await?;
            (EMPTY_REPLY_FALLBACK.to_string(), result)
        }
    };

    Ok(Json(ChatResponse::new(assistant_message, result.outcome)))
}

async fn submit_signals(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SignalsRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let raw: Map<String, Value> = match req.signals {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let result = state
        .apply_turn(&id, |s| state.processor.process(s, &raw))
        .await?;
    Ok(Json(result.outcome))
}

async fn get_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserState>, ApiError> {
    match state.load_state(&id).await? {
        Some(user_state) => Ok(Json(user_state)),
        None => Err(ApiError::NotFound(id)),
    }
}

/// Run the API server
pub async fn run_server(addr: &str, state: Arc<AppState>) -> Result<(), std::io::Error> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "journey API listening");
    axum::serve(listener, router).await
}
