//! Session lifecycle routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::{error_response, not_found, ApiResponse};
use crate::state::AppState;
use docqa_chat::Session;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/reset", post(reset_session))
        .route("/sessions/{id}/transcript", get(get_transcript))
}

fn session_json(session: &Session) -> serde_json::Value {
    json!({
        "id": session.id,
        "createdAt": session.created_at,
        "document": session.document.as_ref().map(|d| d.summary()),
        "transcript": session.transcript,
    })
}

/// POST /api/sessions
async fn create_session(State(state): State<Arc<AppState>>) -> ApiResponse {
    let session = state.sessions.create();
    (StatusCode::CREATED, Json(session_json(&session)))
}

/// GET /api/sessions/{id}
async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResponse {
    match state.sessions.get(&id) {
        Some(session) => (StatusCode::OK, Json(session_json(&session))),
        None => not_found(&id),
    }
}

/// DELETE /api/sessions/{id}
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    if state.sessions.remove(&id) {
        (StatusCode::OK, Json(json!({ "deleted": true })))
    } else {
        not_found(&id)
    }
}

/// POST /api/sessions/{id}/reset: drop the document and the transcript.
async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.sessions.reset(&id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "reset": true }))),
        Err(e) => error_response(e),
    }
}

/// GET /api/sessions/{id}/transcript
async fn get_transcript(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.sessions.transcript(&id) {
        Ok(turns) => (StatusCode::OK, Json(json!({ "turns": turns }))),
        Err(e) => error_response(e),
    }
}
