use crate::error::IngestError;
use lopdf::Document as PdfDocument;

/// Extracts plain text from uploaded PDF bytes. Implementations work
/// entirely in memory; nothing is spooled to disk during extraction.
pub trait PdfExtractor {
    fn extract_text(&self, filename: &str, bytes: &[u8]) -> Result<String, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, filename: &str, bytes: &[u8]) -> Result<String, IngestError> {
        let document = PdfDocument::load_mem(bytes)
            .map_err(|error| IngestError::PdfParse(format!("{filename}: {error}")))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(format!("{filename}: {error}")))?;

            if !text.trim().is_empty() {
                pages.push(text);
            }
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {filename}"
            )));
        }

        Ok(pages.join("\n\n"))
    }
}

/// Extract the full text of a PDF with the default extractor.
pub fn extract_pdf_text(filename: &str, bytes: &[u8]) -> Result<String, IngestError> {
    LopdfExtractor.extract_text(filename, bytes)
}
