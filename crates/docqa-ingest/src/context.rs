//! Bounded document context handed to the completion service.

use docqa_core::{ContextSettings, TruncationPolicy};
use serde::Serialize;

/// Extracted text capped at a fixed number of characters.
///
/// Lengths are counted in Unicode scalar values, never bytes, so the cut
/// always lands on a character boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentContext {
    text: String,
    /// Character count before truncation.
    source_chars: usize,
    truncated: bool,
}

impl DocumentContext {
    pub fn new(text: &str, settings: ContextSettings) -> Self {
        let source_chars = text.chars().count();
        let kept = truncate_chars(text, settings.max_chars, settings.truncation);
        Self {
            text: kept.to_string(),
            source_chars,
            truncated: source_chars > settings.max_chars,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True when there is nothing worth sending to the model.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn source_chars(&self) -> usize {
        self.source_chars
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

/// Keep at most `max_chars` characters of `text` according to `policy`.
pub fn truncate_chars(text: &str, max_chars: usize, policy: TruncationPolicy) -> &str {
    match policy {
        TruncationPolicy::Head => match text.char_indices().nth(max_chars) {
            Some((cut, _)) => &text[..cut],
            None => text,
        },
        TruncationPolicy::Tail => {
            let total = text.chars().count();
            if total <= max_chars {
                return text;
            }
            match text.char_indices().nth(total - max_chars) {
                Some((cut, _)) => &text[cut..],
                None => "",
            }
        }
    }
}
