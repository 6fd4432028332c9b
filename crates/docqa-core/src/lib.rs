//! DocQA Core — configuration and the error type shared by every crate.

pub mod config;
pub mod error;

pub use config::{ContextSettings, DocQaConfig, LlmSettings, TruncationPolicy};
pub use error::{Error, Result};
