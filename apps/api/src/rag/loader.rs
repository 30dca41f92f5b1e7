use std::path::Path;

use thiserror::Error;

use crate::rag::models::PageText;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read uploaded file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Uploaded file is not a PDF")]
    NotPdf,

    #[error("Error loading PDF: {0}")]
    Unreadable(String),

    #[error("No readable text found in PDF")]
    NoPages,
}

/// Turns a document on disk into page-level text.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<PageText>, LoadError>;
}

/// PDF text extraction via `pdf-extract`, one `PageText` per page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<PageText>, LoadError> {
        let bytes = std::fs::read(path)?;
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(LoadError::NotPdf);
        }

        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| LoadError::Unreadable(e.to_string()))?;

        into_pages(pages)
    }
}

/// Numbers raw page strings from 1 and rejects documents with no text at all.
fn into_pages(raw: Vec<String>) -> Result<Vec<PageText>, LoadError> {
    if raw.iter().all(|p| p.trim().is_empty()) {
        return Err(LoadError::NoPages);
    }
    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText::new(i as u32 + 1, text))
        .collect())
}
