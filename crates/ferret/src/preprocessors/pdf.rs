//! PDF text extraction preprocessor backed by lopdf.

use crate::error::Result;
use crate::preprocessors::{Preprocessor, ProcessingContext};
use crate::types::{DocumentStats, PreprocessorType, ProcessedContent};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Separator inserted between extracted pages.
const PAGE_SEPARATOR: &str = "\n\n";

/// Extracts page-ordered text from PDF documents.
///
/// Encrypted and image-only PDFs produce an empty body with the cause
/// recorded in `error`; they are not treated as failures because a scan of
/// zero extracted content is a valid (empty) result.
pub struct PdfPreprocessor;

impl PdfPreprocessor {
    pub fn new() -> Self {
        Self
    }

    fn extract(path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        let doc = match lopdf::Document::load(path) {
            Ok(doc) => doc,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "failed to open PDF");
                return Ok(ProcessedContent::failure(path, format!("invalid PDF: {}", err)));
            }
        };

        if doc.is_encrypted() {
            let mut content = ProcessedContent::success(path, String::new(), Vec::new());
            content.error = Some("encrypted PDF: no text extracted".to_string());
            return Ok(content);
        }

        let pages = doc.get_pages();
        let page_count = pages.len();
        let mut extracted: Vec<String> = Vec::with_capacity(page_count);
        for page_number in pages.keys() {
            ctx.deadline.check()?;
            match doc.extract_text(&[*page_number]) {
                Ok(text) => extracted.push(text),
                Err(err) => {
                    // One bad page does not abort its siblings.
                    debug!(path = %path.display(), page = page_number, error = %err, "page extraction failed");
                }
            }
        }

        let text = extracted.join(PAGE_SEPARATOR);
        let mut content = ProcessedContent::success(path, text, Vec::new());
        content.stats = DocumentStats::from_text(&content.text, page_count);
        if content.text.trim().is_empty() {
            content.text.clear();
            content.error = Some("no extractable text (image-only or empty PDF)".to_string());
        }
        Ok(content)
    }
}

impl Default for PdfPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Preprocessor for PdfPreprocessor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn mime_types(&self) -> &[&str] {
        &["application/pdf"]
    }

    fn produces_body(&self) -> bool {
        true
    }

    fn produces_metadata(&self) -> bool {
        false
    }

    fn preprocessor_type(&self) -> Option<PreprocessorType> {
        Some(PreprocessorType::Document)
    }

    async fn process(&self, path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        ctx.deadline.check()?;
        let path = path.to_path_buf();
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || Self::extract(&path, &ctx))
            .await
            .map_err(|err| crate::error::FerretError::parsing(format!("PDF worker failed: {}", err)))?
    }
}
