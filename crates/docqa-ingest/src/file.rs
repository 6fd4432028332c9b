//! Uploaded document text extraction.
//!
//! Extraction is best effort and never fails: anything that cannot be turned
//! into text comes back as [`Extraction::Empty`] with the reason attached, so
//! callers can tell "no file" from "unsupported format" from "unreadable PDF".

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::pdf;

/// Shown when a file was supplied but yielded no usable text.
pub const NO_EXTRACTABLE_TEXT_WARNING: &str =
    "Uploaded file has no extractable text (some PDFs are scanned images).";

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Text,
    Pdf,
    Unsupported,
}

impl DocumentFormat {
    /// Infer the format from a file name suffix, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Self {
        let name = file_name.to_lowercase();
        if name.ends_with(".txt") {
            Self::Text
        } else if name.ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Unsupported
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Text => "text",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single uploaded file. Immutable once created.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

impl UploadedDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let format = DocumentFormat::from_file_name(&file_name);
        Self {
            file_name,
            bytes,
            format,
        }
    }
}

/// Why an extraction produced no text at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    NoFile,
    UnsupportedFormat { file_name: String },
    Unreadable { reason: String },
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::NoFile => write!(f, "no file supplied"),
            EmptyReason::UnsupportedFormat { file_name } => {
                write!(f, "unsupported format: {}", file_name)
            }
            EmptyReason::Unreadable { reason } => write!(f, "unreadable document: {}", reason),
        }
    }
}

/// Result of extracting text from an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Decoding succeeded. The text may still be blank (e.g. a scanned PDF).
    Text(String),
    Empty(EmptyReason),
}

impl Extraction {
    /// The extracted text, or `""` when nothing was extracted.
    pub fn text(&self) -> &str {
        match self {
            Extraction::Text(text) => text,
            Extraction::Empty(_) => "",
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Extraction::Text(text) => text,
            Extraction::Empty(_) => String::new(),
        }
    }

    /// True when there is at least one non-whitespace character.
    pub fn has_text(&self) -> bool {
        !self.text().trim().is_empty()
    }

    /// User-facing warning for a supplied file that produced no usable text.
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            Extraction::Empty(EmptyReason::NoFile) => None,
            _ if self.has_text() => None,
            _ => Some(NO_EXTRACTABLE_TEXT_WARNING),
        }
    }
}

/// Extract text from an optional upload. No file is not an error.
pub fn extract_upload(upload: Option<&UploadedDocument>) -> Extraction {
    match upload {
        Some(doc) => extract(&doc.file_name, &doc.bytes),
        None => Extraction::Empty(EmptyReason::NoFile),
    }
}

/// Extract text from a named byte buffer.
pub fn extract(file_name: &str, bytes: &[u8]) -> Extraction {
    match DocumentFormat::from_file_name(file_name) {
        DocumentFormat::Text => Extraction::Text(decode_utf8_dropping_invalid(bytes)),
        DocumentFormat::Pdf => match pdf::extract_pages(bytes) {
            Ok(pages) => {
                debug!("Extracted {} PDF pages from {}", pages.len(), file_name);
                Extraction::Text(pdf::join_pages(&pages))
            }
            Err(e) => {
                warn!("Could not parse PDF {}: {}", file_name, e);
                Extraction::Empty(EmptyReason::Unreadable {
                    reason: e.to_string(),
                })
            }
        },
        DocumentFormat::Unsupported => {
            debug!("Unsupported upload format: {}", file_name);
            Extraction::Empty(EmptyReason::UnsupportedFormat {
                file_name: file_name.to_string(),
            })
        }
    }
}

/// Plain `name + bytes → text` form of [`extract`].
pub fn extract_text(file_name: &str, bytes: &[u8]) -> String {
    extract(file_name, bytes).into_text()
}

/// Decode UTF-8, silently skipping any invalid byte sequence.
fn decode_utf8_dropping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                // `None` means the input ends mid-sequence.
                let skip = e.error_len().unwrap_or(after.len());
                rest = &after[skip..];
            }
        }
    }
}
