//! North American phone number validator.

use crate::types::Match;
use crate::validators::{ConfidenceChecks, Validator, scan_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\+?1[-. ])?\(?\d{3}\)?[-. ]\d{3}[-. ]\d{4}\b").expect("static pattern")
});

const POSITIVE: &[&str] = &["phone", "tel", "call", "mobile", "cell", "fax", "contact", "dial"];
const NEGATIVE: &[&str] = &["version", "serial", "isbn", "id:", "ref", "build"];

pub struct PhoneValidator;

impl PhoneValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PhoneValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for PhoneValidator {
    fn name(&self) -> &str {
        "phone"
    }

    fn tag(&self) -> &str {
        "PHONE"
    }

    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match> {
        scan_text(self, &PATTERN, text, source)
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let digits: String = match_text.chars().filter(|c| c.is_ascii_digit()).collect();
        // Strip an optional leading country code.
        let national = if digits.len() == 11 && digits.starts_with('1') {
            &digits[1..]
        } else {
            digits.as_str()
        };
        let area = national.get(0..3).unwrap_or("");
        let exchange = national.get(3..6).unwrap_or("");

        // NANP: area and exchange start 2-9; 555 is reserved for fiction.
        let valid_area = area.len() == 3 && matches!(area.as_bytes()[0], b'2'..=b'9') && area != "555";
        let valid_exchange = !exchange.is_empty() && matches!(exchange.as_bytes().first(), Some(b'2'..=b'9'));
        let not_repeating = {
            let mut chars = national.chars();
            let first = chars.next().unwrap_or_default();
            !chars.all(|c| c == first)
        };

        let mut confidence = 100.0;
        if !valid_area {
            confidence -= 40.0;
        }
        if !valid_exchange {
            confidence -= 30.0;
        }
        if !not_repeating {
            confidence -= 30.0;
        }

        let mut checks = HashMap::new();
        checks.insert("valid_area_code".to_string(), valid_area);
        checks.insert("valid_exchange".to_string(), valid_exchange);
        checks.insert("not_repeating".to_string(), not_repeating);
        (confidence, checks)
    }

    fn positive_keywords(&self) -> &[&str] {
        POSITIVE
    }

    fn negative_keywords(&self) -> &[&str] {
        NEGATIVE
    }
}
