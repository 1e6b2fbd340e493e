//! JSON HTTP server over the upload/list/delete/query boundary.
//!
//! Upload and delete commit their catalog mutation synchronously and return
//! immediately; indexing continues in the background and its progress is
//! visible at `GET /status`.
//!
//! # Endpoints
//!
//! | Method   | Path | Description |
//! |----------|------|-------------|
//! | `POST`   | `/documents` | Upload a batch of base64-encoded files |
//! | `GET`    | `/documents` | List catalogued filenames |
//! | `DELETE` | `/documents/{filename}` | Delete a document, queue a rebuild |
//! | `POST`   | `/query` | Semantic query with optional filename filter |
//! | `GET`    | `/status` | Per-filename background job statuses |
//! | `POST`   | `/reconcile` | Run the reconciliation job |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "no files provided" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::{ingest, reconcile, search};

#[derive(Clone)]
struct AppState {
    coordinator: Coordinator,
    config: Arc<Config>,
}

/// Bind and serve until the process is terminated.
pub async fn run_server(config: &Config, coordinator: Coordinator) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let state = AppState {
        coordinator,
        config: Arc::new(config.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/documents", post(upload).get(list))
        .route("/documents/{filename}", delete(remove))
        .route("/query", post(query))
        .route("/status", get(status))
        .route("/reconcile", post(run_reconcile))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(bind = %bind, "serving HTTP API");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error contract ============

struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": { "code": self.code, "message": self.message }
        }));
        (self.status, body).into_response()
    }
}

// ============ Handlers ============

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Deserialize)]
struct UploadRequest {
    files: Vec<UploadFile>,
}

#[derive(Deserialize)]
struct UploadFile {
    filename: String,
    content_base64: String,
}

async fn upload(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.files.is_empty() {
        return Err(ApiError::bad_request("no files provided"));
    }

    let mut files = Vec::with_capacity(request.files.len());
    for file in request.files {
        let bytes = BASE64
            .decode(&file.content_base64)
            .map_err(|e| ApiError::bad_request(format!("{}: invalid base64: {}", file.filename, e)))?;
        files.push((file.filename, bytes));
    }

    let outcome = ingest::upload_documents(&state.coordinator, files)
        .await
        .map_err(ApiError::internal)?;
    // The indexing job keeps running after this response is sent.
    drop(outcome.job);

    let rejected: Vec<serde_json::Value> = outcome
        .rejected
        .iter()
        .map(|(filename, reason)| json!({ "filename": filename, "reason": reason }))
        .collect();

    Ok(Json(json!({
        "accepted": outcome.accepted,
        "duplicates": outcome.duplicates,
        "rejected": rejected,
        "note": "accepted files become searchable once background indexing completes",
    })))
}

async fn list(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let documents = ingest::list_documents(&state.coordinator)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(json!({ "documents": documents })))
}

async fn remove(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = ingest::delete_document(&state.coordinator, &filename)
        .await
        .map_err(ApiError::internal)?;

    if !outcome.removed {
        return Err(ApiError::not_found(format!("unknown document: {}", filename)));
    }
    drop(outcome.job);

    Ok(Json(json!({
        "removed": true,
        "note": "index rebuild running in background",
    })))
}

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    k: Option<usize>,
    documents: Option<Vec<String>>,
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }

    let k = request.k.unwrap_or(state.config.retrieval.default_k);
    let filter: Option<HashSet<String>> = request
        .documents
        .filter(|docs| !docs.is_empty())
        .map(|docs| docs.into_iter().collect());

    let hits = search::query_documents(&state.coordinator, &request.query, k, filter.as_ref())
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({ "results": hits })))
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let statuses = state.coordinator.statuses().await;
    Json(json!({ "jobs": statuses }))
}

async fn run_reconcile(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let report = reconcile::reconcile(&state.coordinator)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(json!({ "report": report })))
}
