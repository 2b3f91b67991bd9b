//! Text extraction for structured documents.
//!
//! The core only needs `bytes -> ordered page strings`; each format plugs in through
//! [`TextExtractor`] and can be replaced with [`crate::Context::with_extractor`].
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod docx;
#[cfg(feature = "pdf")]
mod pdf;

pub use docx::DocxExtractor;
#[cfg(feature = "pdf")]
pub use pdf::PdfExtractor;

/// Inserted between pages when a document is flattened to one string.
pub const PAGE_BREAK: &str = "\n\u{c}\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Detects a format from the file extension, ignoring ASCII case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if ext.eq_ignore_ascii_case("docx") {
            Some(Self::Docx)
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ExtractError(pub String);

impl ExtractError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub trait TextExtractor: Send + Sync {
    fn format(&self) -> DocumentFormat;

    /// Returns the document's text, one string per page (a single page for flow formats).
    fn extract_text(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// Extractors registered on every new `Context`.
#[cfg_attr(not(feature = "pdf"), allow(unused_mut))]
pub fn default_extractors() -> Vec<Arc<dyn TextExtractor>> {
    let mut extractors: Vec<Arc<dyn TextExtractor>> = vec![Arc::new(DocxExtractor::default())];
    #[cfg(feature = "pdf")]
    extractors.push(Arc::new(PdfExtractor));
    extractors
}
