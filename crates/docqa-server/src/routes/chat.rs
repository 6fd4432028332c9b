//! Document upload and question routes.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::{bad_request, error_response, not_found, ApiResponse};
use crate::state::AppState;
use docqa_ingest::UploadedDocument;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions/{id}/document", post(upload_document))
        .route("/sessions/{id}/ask", post(ask))
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

/// POST /api/sessions/{id}/document: multipart upload, first file field wins.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResponse {
    if !state.sessions.contains(&id) {
        return not_found(&id);
    }

    let upload = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return bad_request("Multipart body has no file field"),
            Err(e) => {
                warn!("Rejected upload for session {}: {}", id, e);
                return bad_request(format!("Invalid multipart body: {}", e));
            }
        };

        let file_name = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        match field.bytes().await {
            Ok(bytes) => break UploadedDocument::new(file_name, bytes.to_vec()),
            Err(e) => {
                warn!("Failed to read upload {} for session {}: {}", file_name, id, e);
                return bad_request(format!("Failed to read {}: {}", file_name, e));
            }
        }
    };

    match state.sessions.load_document(&id, &upload) {
        Ok(loaded) => (StatusCode::OK, Json(json!(loaded.summary()))),
        Err(e) => error_response(e),
    }
}

/// POST /api/sessions/{id}/ask
async fn ask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> ApiResponse {
    if !state.sessions.contains(&id) {
        return not_found(&id);
    }
    if req.question.trim().is_empty() {
        return bad_request("Question must not be empty");
    }

    match state.sessions.ask(&id, &req.question, &state.dispatcher).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "answer": result.answer.message(),
                "outcome": result.answer.outcome(),
                "turns": result.turns,
            })),
        ),
        Err(e) => error_response(e),
    }
}
