//! PDF page text extraction via lopdf.

use lopdf::Document;
use tracing::debug;

/// Extract text from every page, in page order.
///
/// Only a document that cannot be parsed at all is an error. A page whose
/// text cannot be extracted (image-only, odd encodings) contributes `""`.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, lopdf::Error> {
    let doc = Document::load_mem(bytes)?;

    // BTreeMap keyed by 1-based page number, so iteration is page order.
    let pages = doc
        .get_pages()
        .into_keys()
        .map(|page_num| {
            doc.extract_text(&[page_num]).unwrap_or_else(|e| {
                debug!("No text on PDF page {}: {}", page_num, e);
                String::new()
            })
        })
        .collect();

    Ok(pages)
}

/// Join page texts with newlines.
///
/// A document where every page is empty joins to `""`, not to a run of
/// separators. Whitespace on any page is kept as is.
pub fn join_pages(pages: &[String]) -> String {
    if pages.iter().all(String::is_empty) {
        return String::new();
    }
    pages.join("\n")
}
