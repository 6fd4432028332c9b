//! DocQA Ingest — uploaded document → plain text → bounded context.

pub mod context;
pub mod file;
pub mod pdf;

pub use context::{truncate_chars, DocumentContext};
pub use file::{
    extract, extract_text, extract_upload, DocumentFormat, EmptyReason, Extraction,
    UploadedDocument, NO_EXTRACTABLE_TEXT_WARNING,
};
