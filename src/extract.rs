//! Per-page text extraction for uploaded documents.
//!
//! Extraction is pipeline-layer: the blob store supplies raw bytes, this
//! module returns one plain-UTF-8 string per page. Extraction failure for a
//! single document never aborts a batch; the caller logs and skips it.

use std::path::Path;

/// File extensions the upload path accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Extraction error. No panic on malformed input; the pipeline skips the item.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedExtension(String),
    Pdf(String),
    Empty,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedExtension(name) => {
                write!(f, "unsupported file extension: {}", name)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Empty => write!(f, "document contains no extractable text"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// True if the filename carries an extension the pipeline can extract.
pub fn is_supported(filename: &str) -> bool {
    extension(filename)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Extracts per-page text from raw document bytes.
///
/// PDFs split on form-feed page breaks; plain text and Markdown are a single
/// page. Pages with no visible text are dropped, and a document that yields
/// no pages at all is an [`ExtractError::Empty`].
pub fn extract_pages(bytes: &[u8], filename: &str) -> Result<Vec<String>, ExtractError> {
    let text = match extension(filename).as_deref() {
        Some("pdf") => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::Pdf(e.to_string()))?,
        Some("txt") | Some("md") => String::from_utf8_lossy(bytes).into_owned(),
        _ => return Err(ExtractError::UnsupportedExtension(filename.to_string())),
    };

    let pages: Vec<String> = text
        .split('\u{c}')
        .map(|page| page.trim().to_string())
        .filter(|page| !page.is_empty())
        .collect();

    if pages.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_returns_error() {
        let err = extract_pages(b"foo", "archive.tar.gz").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedExtension(_)));
    }

    #[test]
    fn missing_extension_returns_error() {
        let err = extract_pages(b"foo", "README").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedExtension(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pages(b"not a pdf", "doc.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn plain_text_is_one_page() {
        let pages = extract_pages(b"hello world", "notes.txt").unwrap();
        assert_eq!(pages, vec!["hello world".to_string()]);
    }

    #[test]
    fn form_feeds_split_pages() {
        let pages = extract_pages(b"page one\x0cpage two\x0c\x0c", "notes.txt").unwrap();
        assert_eq!(pages, vec!["page one".to_string(), "page two".to_string()]);
    }

    #[test]
    fn whitespace_only_document_is_empty() {
        let err = extract_pages(b"  \n \x0c  ", "blank.txt").unwrap_err();
        assert!(matches!(err, ExtractError::Empty));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported("Slides.PDF"));
        assert!(is_supported("notes.md"));
        assert!(!is_supported("binary.exe"));
        assert!(!is_supported("no_extension"));
    }
}
