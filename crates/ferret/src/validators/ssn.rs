//! US Social Security number validator.

use crate::types::Match;
use crate::validators::{ConfidenceChecks, Validator, scan_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}[- ]\d{2}[- ]\d{4}\b").expect("static pattern"));

/// Published sample numbers that never identify a person.
const KNOWN_SAMPLES: &[&str] = &["078051120", "219099999", "457555462"];

const POSITIVE: &[&str] = &[
    "ssn", "social security", "social-security", "taxpayer", "tin", "payroll", "w-2", "w2", "1099", "benefits",
];
const NEGATIVE: &[&str] = &["phone", "fax", "ext", "invoice", "order", "tracking", "isbn"];

pub struct SsnValidator;

impl SsnValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SsnValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for SsnValidator {
    fn name(&self) -> &str {
        "ssn"
    }

    fn tag(&self) -> &str {
        "SSN"
    }

    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match> {
        scan_text(self, &PATTERN, text, source)
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let digits: String = match_text.chars().filter(|c| c.is_ascii_digit()).collect();
        let area: u32 = digits.get(0..3).and_then(|s| s.parse().ok()).unwrap_or(0);
        let group: u32 = digits.get(3..5).and_then(|s| s.parse().ok()).unwrap_or(0);
        let serial: u32 = digits.get(5..9).and_then(|s| s.parse().ok()).unwrap_or(0);

        // Structural rules: area 000/666/900+ never issued, group and serial
        // must be non-zero.
        let valid_area = area != 0 && area != 666 && area < 900;
        let valid_group = group != 0;
        let valid_serial = serial != 0;
        let not_sample = !KNOWN_SAMPLES.contains(&digits.as_str());

        let mut confidence = 100.0;
        if !valid_area {
            confidence -= 50.0;
        }
        if !valid_group {
            confidence -= 25.0;
        }
        if !valid_serial {
            confidence -= 25.0;
        }
        if !not_sample {
            confidence -= 15.0;
        }

        let mut checks = HashMap::new();
        checks.insert("valid_area".to_string(), valid_area);
        checks.insert("valid_group".to_string(), valid_group);
        checks.insert("valid_serial".to_string(), valid_serial);
        checks.insert("not_sample".to_string(), not_sample);
        (confidence, checks)
    }

    fn positive_keywords(&self) -> &[&str] {
        POSITIVE
    }

    fn negative_keywords(&self) -> &[&str] {
        NEGATIVE
    }
}
