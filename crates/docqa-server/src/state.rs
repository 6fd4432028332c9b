//! Shared application state.

use docqa_chat::{QueryDispatcher, SessionManager};
use docqa_core::DocQaConfig;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: DocQaConfig,
    pub sessions: SessionManager,
    pub dispatcher: QueryDispatcher,
}

impl AppState {
    /// State backed by the configured OpenAI-compatible endpoint.
    pub fn new(config: DocQaConfig) -> Self {
        let dispatcher = QueryDispatcher::from_settings(&config.llm);
        Self::with_dispatcher(config, dispatcher)
    }

    pub fn with_dispatcher(config: DocQaConfig, dispatcher: QueryDispatcher) -> Self {
        let sessions = SessionManager::new(config.max_sessions, config.context);
        Self {
            config,
            sessions,
            dispatcher,
        }
    }
}
