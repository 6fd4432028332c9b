//! Prompt assembly and single-attempt dispatch.

use std::sync::Arc;

use tracing::{debug, warn};

use docqa_core::LlmSettings;

use crate::prompt::{build_messages, NO_CONTEXT_MESSAGE, SERVICE_UNAVAILABLE_MESSAGE};
use crate::providers::{CompletionService, OpenAiClient};
use crate::types::CompletionRequest;

/// Outcome of one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// The service reply, verbatim.
    Answered(String),
    /// Context was blank; no remote call was made.
    NoContext,
    /// The service call failed.
    Unavailable { reason: String },
}

impl Answer {
    /// Text shown to the user and recorded as the assistant turn.
    pub fn message(&self) -> &str {
        match self {
            Answer::Answered(text) => text,
            Answer::NoContext => NO_CONTEXT_MESSAGE,
            Answer::Unavailable { .. } => SERVICE_UNAVAILABLE_MESSAGE,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Answer::Answered(_) => "answered",
            Answer::NoContext => "no_context",
            Answer::Unavailable { .. } => "unavailable",
        }
    }
}

/// Builds the prompt and sends it to a completion service.
#[derive(Clone)]
pub struct QueryDispatcher {
    service: Arc<dyn CompletionService>,
    model: String,
    temperature: f64,
}

impl QueryDispatcher {
    pub fn new(service: Arc<dyn CompletionService>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            service,
            model: model.into(),
            temperature,
        }
    }

    /// Dispatcher backed by the OpenAI client described by `settings`.
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self::new(
            Arc::new(OpenAiClient::from_settings(settings)),
            settings.model.clone(),
            settings.temperature,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Answer `question` from `context`.
    ///
    /// Never fails: a blank context or a service error is reported through
    /// the returned [`Answer`].
    pub async fn answer(&self, context: &str, question: &str) -> Answer {
        if context.trim().is_empty() {
            debug!("No document context; skipping completion call");
            return Answer::NoContext;
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: build_messages(context, question),
            temperature: self.temperature,
        };

        debug!(
            "Dispatching question ({} chars) with {} chars of context",
            question.chars().count(),
            context.chars().count()
        );

        match self.service.complete(request).await {
            Ok(text) => Answer::Answered(text),
            Err(e) => {
                warn!("Completion service failed: {}", e);
                Answer::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}
