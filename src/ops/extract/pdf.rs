use super::{DocumentFormat, ExtractError, TextExtractor};

/// Per-page text via `lopdf`. Encrypted documents are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|err| ExtractError::new(format!("failed to parse pdf: {err}")))?;
        if document.trailer.get(b"Encrypt").is_ok() {
            return Err(ExtractError::new("pdf is encrypted"));
        }
        document
            .get_pages()
            .keys()
            .map(|&page_number| {
                document.extract_text(&[page_number]).map_err(|err| {
                    ExtractError::new(format!(
                        "failed to extract text from page {page_number}: {err}"
                    ))
                })
            })
            .collect()
    }
}
