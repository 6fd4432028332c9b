//! Chat-completion backends.
//!
//! `OpenAiClient` talks to any OpenAI-compatible `/chat/completions`
//! endpoint. One request, one reply: no streaming, no retries.

use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use docqa_core::{Error, LlmSettings, Result};

use crate::types::CompletionRequest;

/// Anything that turns a prompt into a single textual completion.
pub trait CompletionService: Send + Sync {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'static, Result<String>>;
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self::new(settings.base_url.clone(), settings.api_key.clone())
    }
}

impl CompletionService for OpenAiClient {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'static, Result<String>> {
        let client = self.client.clone();
        let url = format!("{}/chat/completions", self.base_url);
        let api_key = self.api_key.clone();

        Box::pin(async move {
            let body = json!({
                "model": request.model,
                "messages": request.messages,
                "temperature": request.temperature,
            });

            debug!(
                "Requesting completion from {} with model {} ({} messages)",
                url,
                request.model,
                request.messages.len()
            );

            let response = client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(Error::Api {
                    status: status.as_u16(),
                    message: api_error_message(&text),
                });
            }

            let parsed: serde_json::Value = response
                .json()
                .await
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;

            parsed["choices"][0]["message"]["content"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::MalformedResponse("missing choices[0].message.content".into())
                })
        })
    }
}

/// Pull `error.message` out of an OpenAI error body, else keep the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
