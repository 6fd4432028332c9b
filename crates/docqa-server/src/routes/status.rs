//! Service status.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}

/// GET /api/status
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let context = state.sessions.context_settings();
    Json(serde_json::json!({
        "llmConfigured": !state.config.llm.api_key.trim().is_empty(),
        "model": state.dispatcher.model(),
        "temperature": state.dispatcher.temperature(),
        "maxContextChars": context.max_chars,
        "truncation": context.truncation,
        "activeSessions": state.sessions.count(),
    }))
}
