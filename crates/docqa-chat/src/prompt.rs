//! Prompt text and message assembly.

use crate::types::ChatMessage;

/// Restricts the model to the supplied document.
pub const SYSTEM_INSTRUCTION: &str = "You answer questions ONLY using the provided document context. \
If the answer isn't in the document, say you can't find it.";

/// Returned locally when there is no usable document context.
pub const NO_CONTEXT_MESSAGE: &str = "Please upload a .txt or .pdf with text first.";

/// Recorded as the assistant turn when the completion service call fails.
pub const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "The document service is unavailable right now, please try again.";

/// User message body: labeled context section followed by the labeled question.
pub fn user_content(context: &str, question: &str) -> String {
    format!("DOCUMENT CONTEXT:\n{}\n\nQUESTION:\n{}", context, question)
}

/// Build the two-message prompt.
pub fn build_messages(context: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_INSTRUCTION),
        ChatMessage::user(user_content(context, question)),
    ]
}
