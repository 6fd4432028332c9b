//! Document question answering over an external chat-completion service.
//!
//! The prompt is always two messages: a fixed system instruction and a user
//! message carrying the document context and the question. A blank context
//! short-circuits to a local message without any remote call.

pub mod dispatch;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod types;

pub use dispatch::{Answer, QueryDispatcher};
pub use providers::{CompletionService, OpenAiClient};
pub use session::{LoadedDocument, Session, SessionManager};
pub use types::*;
