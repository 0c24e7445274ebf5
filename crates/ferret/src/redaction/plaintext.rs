//! In-memory text redaction.
//!
//! The plaintext redactor is also the workhorse behind the PDF companion
//! document and the recovery ladder's fallback: it locates matches inside the
//! intermediate text by line and offset, substitutes replacements, and
//! records byte positions plus verification hashes against the original.

use crate::redaction::audit::context_hash;
use crate::redaction::strategies;
use crate::types::{Match, RedactionMapping, RedactionStrategyKind};
use rand::Rng;
use tracing::debug;

#[derive(Debug)]
pub struct TextRedaction {
    pub redacted: String,
    pub mappings: Vec<RedactionMapping>,
}

/// Replace every located match in `text`, returning the rewritten text and
/// the ordered mappings. Matches that cannot be located (metadata-derived,
/// or stale offsets) are skipped.
pub fn redact_text<R: Rng>(
    text: &str,
    matches: &[Match],
    strategy: RedactionStrategyKind,
    rng: &mut R,
) -> TextRedaction {
    let mut line_starts = Vec::new();
    let mut acc = 0usize;
    for line in text.lines() {
        line_starts.push(acc);
        acc += line.len() + 1;
    }

    // Locate every match and drop overlaps, earliest match wins.
    let mut located: Vec<(usize, usize, &Match)> = Vec::new();
    for m in matches {
        let Some(line) = m.line_number else {
            continue;
        };
        let Some(line_start) = line_starts.get(line as usize - 1) else {
            debug!(line, "match line out of range, skipping");
            continue;
        };
        let start = line_start + m.offset;
        let end = start + m.text.len();
        if text.get(start..end) != Some(m.text.as_str()) {
            debug!(start, end, "match text does not align with content, skipping");
            continue;
        }
        located.push((start, end, m));
    }
    located.sort_by_key(|(start, end, _)| (*start, *end));
    located.dedup_by(|next, kept| next.0 < kept.1);

    let mut redacted = text.to_string();
    let mut mappings = Vec::with_capacity(located.len());
    for (start, end, m) in located.iter().rev() {
        let replacement = strategies::replacement(strategy, &m.match_type, &m.text, rng);
        redacted.replace_range(start..end, &replacement);
        mappings.push(RedactionMapping {
            line: m.line_number.unwrap_or(0),
            start: *start,
            end: *end,
            replacement,
            data_type: m.match_type.clone(),
            strategy,
            confidence: m.confidence,
            verification_hash: context_hash(text, *start, *end),
        });
    }
    mappings.reverse();
    TextRedaction { redacted, mappings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{CreditCardValidator, SsnValidator, Validator};
    use std::path::Path;

    #[test]
    fn simple_strategy_replaces_with_tag() {
        let text = "SSN 123-45-6789 on file\n";
        let matches = SsnValidator::new().validate_content(text, Path::new("hr.txt"));
        let mut rng = rand::rng();
        let result = redact_text(text, &matches, RedactionStrategyKind::Simple, &mut rng);

        assert_eq!(result.redacted, "SSN [SSN-REDACTED] on file\n");
        assert_eq!(result.mappings.len(), 1);
        let mapping = &result.mappings[0];
        assert_eq!(mapping.start, 4);
        assert_eq!(mapping.end, 15);
        assert_eq!(mapping.line, 1);
        assert!(verify(text, mapping));
    }

    fn verify(original: &str, mapping: &RedactionMapping) -> bool {
        crate::redaction::audit::verify_mapping(original, mapping)
    }

    #[test]
    fn format_preserving_keeps_length() {
        let text = "Pay to card 4111 1111 1111 1111\n";
        let matches = CreditCardValidator::new().validate_content(text, Path::new("payment.txt"));
        let mut rng = rand::rng();
        let result = redact_text(text, &matches, RedactionStrategyKind::FormatPreserving, &mut rng);

        assert_eq!(result.redacted.len(), text.len());
        assert_ne!(result.redacted, text);
    }

    #[test]
    fn multiple_matches_across_lines() {
        let text = "SSN 123-45-6789\ncontact 517-44-3921 ssn backup\n";
        let matches = SsnValidator::new().validate_content(text, Path::new("hr.txt"));
        assert_eq!(matches.len(), 2);
        let mut rng = rand::rng();
        let result = redact_text(text, &matches, RedactionStrategyKind::Simple, &mut rng);
        assert_eq!(result.redacted.matches("[SSN-REDACTED]").count(), 2);
        assert_eq!(result.mappings.len(), 2);
        // Mappings are ordered by position.
        assert!(result.mappings[0].start < result.mappings[1].start);
    }

    #[test]
    fn metadata_matches_are_skipped() {
        let text = "no inline matches here\n";
        let m = Match {
            match_type: "METADATA".to_string(),
            text: "Apple".to_string(),
            line_number: None,
            offset: 0,
            confidence: 80.0,
            validator: "metadata".to_string(),
            file: "x.jpg".into(),
            context: Default::default(),
            metadata: Default::default(),
        };
        let mut rng = rand::rng();
        let result = redact_text(text, &[m], RedactionStrategyKind::Simple, &mut rng);
        assert_eq!(result.redacted, text);
        assert!(result.mappings.is_empty());
    }

    #[test]
    fn no_sensitive_trigram_survives_simple_redaction() {
        let text = "Pay to card 4111 1111 1111 1111\n";
        let matches = CreditCardValidator::new().validate_content(text, Path::new("payment.txt"));
        let original = matches[0].text.clone();
        let mut rng = rand::rng();
        let result = redact_text(text, &matches, RedactionStrategyKind::Simple, &mut rng);

        for window in original
            .as_bytes()
            .windows(3)
            .filter(|w| w.iter().any(|b| b.is_ascii_alphanumeric()))
        {
            let needle = std::str::from_utf8(window).unwrap();
            assert!(
                !result.redacted.contains(needle),
                "trigram {:?} survived redaction",
                needle
            );
        }
    }
}
