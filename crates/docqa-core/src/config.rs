//! Runtime configuration, read from the process environment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
/// Context cap, in characters.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;
pub const DEFAULT_MAX_SESSIONS: usize = 100;
pub const DEFAULT_PORT: u16 = 8501;

/// Which part of an over-long document is kept as context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    /// First `max_chars` characters.
    #[default]
    Head,
    /// Last `max_chars` characters.
    Tail,
}

impl FromStr for TruncationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "head" => Ok(Self::Head),
            "tail" => Ok(Self::Tail),
            other => Err(Error::Config(format!(
                "DOCQA_TRUNCATION must be 'head' or 'tail', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TruncationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TruncationPolicy::Head => write!(f, "head"),
            TruncationPolicy::Tail => write!(f, "tail"),
        }
    }
}

/// Completion service settings.
#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
}

// The credential must never be printed.
impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Document context settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSettings {
    pub max_chars: usize,
    pub truncation: TruncationPolicy,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CONTEXT_CHARS,
            truncation: TruncationPolicy::Head,
        }
    }
}

/// Top-level DocQA configuration.
#[derive(Debug, Clone)]
pub struct DocQaConfig {
    /// HTTP server port.
    pub port: u16,
    pub llm: LlmSettings,
    pub context: ContextSettings,
    /// Upload body limit in bytes.
    pub max_upload_bytes: usize,
    pub max_sessions: usize,
}

impl DocQaConfig {
    /// Create configuration from the process environment.
    ///
    /// Fails when `OPENAI_API_KEY` is unset or blank.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::Config("OPENAI_API_KEY is not set. Export it and restart.".into())
            })?;

        let llm = LlmSettings {
            api_key,
            base_url: lookup("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model: lookup("DOCQA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            temperature: parse_var(&lookup, "DOCQA_TEMPERATURE", DEFAULT_TEMPERATURE)?,
        };

        let truncation = match lookup("DOCQA_TRUNCATION") {
            Some(v) => v.parse()?,
            None => TruncationPolicy::Head,
        };

        let max_chars = parse_var(&lookup, "DOCQA_MAX_CONTEXT_CHARS", DEFAULT_MAX_CONTEXT_CHARS)?;
        if max_chars == 0 {
            return Err(Error::Config(
                "DOCQA_MAX_CONTEXT_CHARS must be greater than zero".into(),
            ));
        }

        let upload_mb: usize = parse_var(&lookup, "DOCQA_MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)?;
        let max_upload_bytes = upload_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            Error::Config(format!("DOCQA_MAX_UPLOAD_MB is too large: {}", upload_mb))
        })?;

        Ok(Self {
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            llm,
            context: ContextSettings {
                max_chars,
                truncation,
            },
            max_upload_bytes,
            max_sessions: parse_var(&lookup, "DOCQA_MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: '{}'", key, raw))),
        None => Ok(default),
    }
}
