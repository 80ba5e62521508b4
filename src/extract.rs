//! Plain-text extraction from uploaded documents.
//!
//! Only plain text and markdown are accepted; everything else is an
//! [`ExtractError::UnsupportedFormat`] before any read is attempted.

use std::path::Path;

/// File extensions accepted as analyzable documents.
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Errors surfaced by document text extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The file type is not plain text or markdown.
    #[error("unsupported file type {0:?}; use .txt or .md files")]
    UnsupportedFormat(String),
    /// The underlying read failed.
    #[error("failed to read the document: {0}")]
    Read(#[from] std::io::Error),
}

/// Read the full decoded text content of a document.
///
/// # Errors
///
/// Returns [`ExtractError::UnsupportedFormat`] for any extension other than
/// `.txt`/`.md`/`.markdown` (checked case-insensitively, before touching the
/// filesystem) and [`ExtractError::Read`] when the read itself fails.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ExtractError::UnsupportedFormat(extension));
    }
    Ok(std::fs::read_to_string(path)?)
}
