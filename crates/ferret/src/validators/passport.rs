//! Passport number validator.
//!
//! Covers the US format (nine digits, or one letter followed by eight
//! digits). Bare nine-digit runs are only considered when the line carries a
//! passport keyword; the letter-prefixed form stands on its own.

use crate::types::Match;
use crate::validators::{ConfidenceChecks, Validator, context, scan_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static LETTER_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]\d{8}\b").expect("static pattern"));
static DIGIT_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{9}\b").expect("static pattern"));

const POSITIVE: &[&str] = &["passport", "travel document", "nationality", "visa", "immigration", "border"];
const NEGATIVE: &[&str] = &["ssn", "social security", "routing", "account", "tracking", "order"];

pub struct PassportValidator;

impl PassportValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PassportValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for PassportValidator {
    fn name(&self) -> &str {
        "passport"
    }

    fn tag(&self) -> &str {
        "PASSPORT"
    }

    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match> {
        let mut matches = scan_text(self, &LETTER_FORM, text, source);

        // Nine bare digits are ambiguous; require a same-line keyword.
        let digit_candidates = scan_text(self, &DIGIT_FORM, text, source);
        matches.extend(digit_candidates.into_iter().filter(|m| {
            let line = m.context.full_line.to_lowercase();
            POSITIVE.iter().any(|k| line.contains(k))
        }));
        matches
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let digits: String = match_text.chars().filter(|c| c.is_ascii_digit()).collect();

        let valid_format = (match_text.len() == 9 && (digits.len() == 9 || digits.len() == 8))
            && match_text.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
        let not_repeated = {
            let mut chars = digits.chars();
            let first = chars.next().unwrap_or_default();
            !chars.all(|c| c == first)
        };
        let not_sequential = !["123456789", "012345678", "987654321"].contains(&digits.as_str());

        let mut confidence = 100.0;
        if !valid_format {
            confidence -= 40.0;
        }
        if !not_repeated {
            confidence -= 30.0;
        }
        if !not_sequential {
            confidence -= 30.0;
        }

        let mut checks = HashMap::new();
        checks.insert("valid_format".to_string(), valid_format);
        checks.insert("not_repeated".to_string(), not_repeated);
        checks.insert("not_sequential".to_string(), not_sequential);
        (confidence, checks)
    }

    fn positive_keywords(&self) -> &[&str] {
        POSITIVE
    }

    fn negative_keywords(&self) -> &[&str] {
        NEGATIVE
    }

    fn analyze_context(&self, _match_text: &str, context_info: &crate::types::MatchContext) -> f64 {
        // Without any passport-related context the category is weak evidence
        // on its own; lean on the keyword delta harder than other categories.
        if context_info.positive_keywords.is_empty() {
            (context_info.context_delta - 15.0).clamp(context::MIN_DELTA, context::MAX_DELTA)
        } else {
            context_info.context_delta
        }
    }
}
