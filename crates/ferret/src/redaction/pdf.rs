//! PDF redactor.
//!
//! Text-to-content-stream coordinate mapping is not attempted: the redactor
//! locates matches within the extracted body, emits a companion redacted
//! text document, and records watermark notes for the affected pages. The
//! mappings it records are positions in the extracted text.

use crate::redaction::plaintext::{TextRedaction, redact_text};
use crate::types::{Match, RedactionStrategyKind};
use rand::Rng;
use std::collections::BTreeSet;

pub struct PdfRedaction {
    /// Companion redacted text document.
    pub companion_text: String,
    pub mappings: Vec<crate::types::RedactionMapping>,
    /// Pages that carry at least one redaction and receive a watermark note.
    pub watermarked_pages: Vec<usize>,
}

/// Redact the extracted PDF body. `page_separator_offsets` are the byte
/// offsets of page boundaries within the extracted text, used to attribute
/// matches to pages.
pub fn redact_pdf_text<R: Rng>(
    extracted_text: &str,
    matches: &[Match],
    strategy: RedactionStrategyKind,
    rng: &mut R,
) -> PdfRedaction {
    let TextRedaction { redacted, mappings } = redact_text(extracted_text, matches, strategy, rng);

    // Page boundaries follow the extraction convention of a blank-line
    // separator between pages.
    let mut page_starts = vec![0usize];
    let mut from = 0usize;
    while let Some(found) = extracted_text[from..].find("\n\n") {
        let at = from + found + 2;
        page_starts.push(at);
        from = at;
    }

    let pages: BTreeSet<usize> = mappings
        .iter()
        .map(|mapping| page_starts.partition_point(|start| *start <= mapping.start))
        .collect();

    let mut companion_text = String::new();
    for page in &pages {
        companion_text.push_str(&format!("[page {}: content redacted]\n", page));
    }
    companion_text.push_str(&redacted);

    PdfRedaction {
        companion_text,
        mappings,
        watermarked_pages: pages.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{SsnValidator, Validator};
    use std::path::Path;

    #[test]
    fn companion_contains_redacted_text_and_page_notes() {
        let text = "page one intro\n\nSSN 123-45-6789 on page two\n";
        let matches = SsnValidator::new().validate_content(text, Path::new("report.pdf"));
        assert_eq!(matches.len(), 1);

        let mut rng = rand::rng();
        let result = redact_pdf_text(text, &matches, RedactionStrategyKind::Simple, &mut rng);
        assert!(result.companion_text.contains("[SSN-REDACTED]"));
        assert!(!result.companion_text.contains("123-45-6789"));
        assert_eq!(result.watermarked_pages, vec![2]);
        assert!(result.companion_text.starts_with("[page 2: content redacted]"));
    }

    #[test]
    fn clean_document_has_no_watermarks() {
        let text = "nothing sensitive\n\nhere either\n";
        let mut rng = rand::rng();
        let result = redact_pdf_text(text, &[], RedactionStrategyKind::Simple, &mut rng);
        assert!(result.watermarked_pages.is_empty());
        assert!(result.mappings.is_empty());
    }
}
