#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Text extraction for broker listing PDFs.
//!
//! Broker sale listings are free-form prose, so downstream extraction
//! treats them as one flat, lowercase text blob. This crate turns a PDF
//! byte stream into that blob using pure-Rust text extraction
//! ([`pdf_extract`]): page texts are joined with newlines and case-folded.
//!
//! Pages without a text layer (scanned images) contribute an empty string.
//! A stream that cannot be opened as a PDF, or a document with no text at
//! all, is reported as a [`PdfError`] rather than a panic.

use std::path::Path;

/// Errors specific to PDF text extraction.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// The stream could not be opened or parsed as a PDF.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// The PDF opened but none of its pages carry a text layer.
    #[error("PDF contains no extractable text ({pages} pages)")]
    NoText {
        /// Number of pages in the document.
        pages: usize,
    },

    /// Reading the PDF from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracts the lowercase text of every page in `bytes`.
///
/// # Errors
///
/// Returns [`PdfError::Extraction`] if the bytes are not a readable PDF and
/// [`PdfError::NoText`] if no page yields any text.
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfError> {
    // pdf-extract panics on some malformed streams instead of erroring.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| PdfError::Extraction("PDF parser aborted on malformed input".to_owned()))?
        .map_err(|e| PdfError::Extraction(format!("failed to extract text from PDF: {e}")))?;

    let page_count = pages.len();
    let text = join_pages(&pages);

    log::debug!(
        "Extracted {} characters of text from {page_count} PDF pages",
        text.len()
    );

    if text.trim().is_empty() {
        return Err(PdfError::NoText { pages: page_count });
    }

    Ok(text)
}

/// Reads a PDF from disk and extracts its lowercase text.
///
/// # Errors
///
/// Returns [`PdfError::Io`] if the file cannot be read, otherwise the same
/// errors as [`extract_text`].
pub fn extract_text_from_path(path: &Path) -> Result<String, PdfError> {
    let bytes = std::fs::read(path)?;
    log::debug!("Read {} bytes from {}", bytes.len(), path.display());
    extract_text(&bytes)
}

/// Joins page texts with newlines and case-folds the result.
#[must_use]
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase()
}
