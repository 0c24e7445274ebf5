//! Intellectual property marker validator.
//!
//! Finds patent numbers, trademark symbols, and confidentiality markings
//! that indicate a document carries protected material.

use crate::types::Match;
use crate::validators::{ConfidenceChecks, Validator, scan_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bUS ?\d{1,2},?\d{3},?\d{3} ?[AB]\d?\b|\bpatent (?:no\.?|number) ?[0-9,]{7,12}\b|\btrade secret\b|\bproprietary and confidential\b|\bconfidential - do not distribute\b",
    )
    .expect("static pattern")
});

const POSITIVE: &[&str] = &["patent", "invention", "claim", "filing", "uspto", "trademark", "copyright", "license"];
const NEGATIVE: &[&str] = &["pending public release", "press release", "published", "open source"];

pub struct IntellectualPropertyValidator;

impl IntellectualPropertyValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IntellectualPropertyValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for IntellectualPropertyValidator {
    fn name(&self) -> &str {
        "intellectual-property"
    }

    fn tag(&self) -> &str {
        "INTELLECTUAL_PROPERTY"
    }

    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match> {
        scan_text(self, &PATTERN, text, source)
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let lower = match_text.to_lowercase();
        let digit_count = match_text.chars().filter(|c| c.is_ascii_digit()).count();

        // Patent numbers are the strongest signal; phrase markers alone are
        // weaker.
        let numbered = digit_count >= 7;
        let phrase_marker = lower.contains("trade secret")
            || lower.contains("proprietary")
            || lower.contains("confidential")
            || lower.contains("patent");

        let mut confidence = 100.0;
        if !numbered {
            confidence -= 30.0;
        }
        if !phrase_marker && !numbered {
            confidence -= 40.0;
        }

        let mut checks = HashMap::new();
        checks.insert("numbered_reference".to_string(), numbered);
        checks.insert("phrase_marker".to_string(), phrase_marker);
        (confidence, checks)
    }

    fn positive_keywords(&self) -> &[&str] {
        POSITIVE
    }

    fn negative_keywords(&self) -> &[&str] {
        NEGATIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patent_number_matches() {
        let v = IntellectualPropertyValidator::new();
        let matches = v.validate_content("see US 10,123,456 B2 for the claim\n", Path::new("a.txt"));
        assert_eq!(matches.len(), 1);
        assert!(matches[0].confidence >= 90.0);
    }

    #[test]
    fn trade_secret_phrase_matches_lower() {
        let v = IntellectualPropertyValidator::new();
        let matches = v.validate_content("this file is a trade secret\n", Path::new("a.txt"));
        assert_eq!(matches.len(), 1);
        let (conf, checks) = v.calculate_confidence("trade secret");
        assert_eq!(checks["numbered_reference"], false);
        assert_eq!(conf, 70.0);
    }
}
