//! HTTP API server.
//!
//! Exposes the question, search, upload and history flows as JSON endpoints.
//! Every failure is rendered through [`ApiError`], which owns the single
//! mapping from error kind to status code and label.

use crate::cli::Output;
use crate::completion::Message;
use crate::config::Settings;
use crate::conversation::DEFAULT_CONVERSATION;
use crate::error::{ErrorKind, OpinaError};
use crate::orchestrator::Orchestrator;
use crate::rag::Snippet;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

type AppState = Arc<Orchestrator>;

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    // The collection is opened once here; a missing key or unreadable store fails startup.
    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    let app = build_router(orchestrator);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Opina API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask", "POST /app/questions/");
    Output::kv("Search", "POST /app/search/");
    Output::kv("Upload", "POST /app/upload/");
    Output::kv("History", "GET  /app/history/");
    Output::kv("Clear history", "POST /app/questions/clear-history/");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Build the API router around a ready orchestrator.
pub fn build_router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = cors_layer(&orchestrator.settings().server.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/app/questions", post(ask_question))
        .route("/app/questions/", post(ask_question))
        .route("/app/questions/clear-history", post(clear_history))
        .route("/app/questions/clear-history/", post(clear_history))
        .route("/app/search", post(search))
        .route("/app/search/", post(search))
        .route("/app/upload", post(upload))
        .route("/app/upload/", post(upload))
        .route("/app/history", get(history))
        .route("/app/history/", get(history))
        .layer(cors)
        .with_state(orchestrator)
}

/// `"*"` allows any origin; otherwise a comma-separated list of origins.
fn cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

// === Errors ===

/// Structured failure payload returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
    detail: Option<String>,
    success: bool,
}

#[derive(Debug)]
struct ApiError {
    kind: ErrorKind,
    detail: Option<String>,
}

impl ApiError {
    fn status_and_label(kind: ErrorKind) -> (StatusCode, &'static str) {
        match kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "Invalid request"),
            ErrorKind::NoResults => (StatusCode::NOT_FOUND, "No results found"),
            ErrorKind::Provider => (StatusCode::BAD_GATEWAY, "Language model provider failed"),
            ErrorKind::Translation => (StatusCode::BAD_GATEWAY, "Translation failed"),
            ErrorKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "Vector store failure"),
            ErrorKind::Config => (StatusCode::INTERNAL_SERVER_ERROR, "Service misconfigured"),
            ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        }
    }
}

impl From<OpinaError> for ApiError {
    fn from(e: OpinaError) -> Self {
        Self {
            kind: e.kind(),
            detail: Some(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            kind: ErrorKind::Validation,
            detail: Some(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, label) = Self::status_and_label(self.kind);

        if status.is_server_error() {
            error!("{}: {}", label, self.detail.as_deref().unwrap_or_default());
        } else {
            warn!("{}: {}", label, self.detail.as_deref().unwrap_or_default());
        }

        let body = ErrorBody {
            error: label.to_string(),
            detail: self.detail,
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// === Request/Response Types ===

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuestionResponse {
    answer: String,
    results: Vec<Snippet>,
    success: bool,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SearchResponse {
    results: Vec<Snippet>,
    total_results: usize,
    success: bool,
}

#[derive(Deserialize)]
struct UploadRequest {
    reviews: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct UploadResponse {
    message: String,
    documents_processed: usize,
    success: bool,
}

#[derive(Deserialize)]
struct ConversationQuery {
    conversation_id: Option<String>,
}

impl ConversationQuery {
    fn id(&self) -> &str {
        self.conversation_id.as_deref().unwrap_or(DEFAULT_CONVERSATION)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryResponse {
    history: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClearResponse {
    message: String,
    success: bool,
}

// === Handlers ===

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to the Opina review Q&A API" }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ask_question(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> ApiResult<QuestionResponse> {
    let Json(req) = payload?;
    let conversation = req.conversation_id.as_deref().unwrap_or(DEFAULT_CONVERSATION);

    let answer = state.ask(conversation, &req.question).await?;

    Ok(Json(QuestionResponse {
        answer: answer.answer,
        results: answer.sources,
        success: true,
    }))
}

async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<SearchResponse> {
    let Json(req) = payload?;
    let outcome = state.search(&req.query).await?;

    Ok(Json(SearchResponse {
        results: outcome.results,
        total_results: outcome.total_results,
        success: true,
    }))
}

async fn upload(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> ApiResult<UploadResponse> {
    let Json(req) = payload?;
    let report = state.ingest_text(&req.reviews).await?;

    Ok(Json(UploadResponse {
        message: "Reviews uploaded successfully.".to_string(),
        documents_processed: report.documents_processed,
        success: true,
    }))
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: state.history(query.id()).await,
    })
}

async fn clear_history(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> Json<ClearResponse> {
    state.clear_history(query.id()).await;
    Json(ClearResponse {
        message: "Chat history cleared.".to_string(),
        success: true,
    })
}
