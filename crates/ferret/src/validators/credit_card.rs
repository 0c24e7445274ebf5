//! Credit card number validator.

use crate::types::Match;
use crate::validators::{ConfidenceChecks, Validator, scan_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Issuer-prefix-anchored candidate pattern: Visa, Mastercard, Amex,
/// Discover, with optional space/hyphen grouping.
static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:4\d{3}|5[1-5]\d{2}|3[47]\d{2}|6(?:011|5\d{2}))(?:[ -]?\d{4}){2}[ -]?\d{1,4}\b")
        .expect("static pattern")
});

/// Well-known documentation/test numbers.
const TEST_NUMBERS: &[&str] = &[
    "4111111111111111",
    "4242424242424242",
    "4012888888881881",
    "5555555555554444",
    "5105105105105100",
    "378282246310005",
    "371449635398431",
    "6011111111111117",
];

const POSITIVE: &[&str] = &[
    "card", "credit", "visa", "mastercard", "amex", "payment", "billing", "cvv", "expiry", "expiration", "pan",
];
const NEGATIVE: &[&str] = &["order", "tracking", "invoice #", "sku", "serial", "part number", "ticket"];

/// Luhn modular checksum over the digits of `value`.
pub fn luhn_valid(digits: &str) -> bool {
    let digits: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

pub struct CreditCardValidator;

impl CreditCardValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CreditCardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for CreditCardValidator {
    fn name(&self) -> &str {
        "credit-card"
    }

    fn tag(&self) -> &str {
        "CREDIT_CARD"
    }

    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match> {
        scan_text(self, &PATTERN, text, source)
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let digits: String = match_text.chars().filter(|c| c.is_ascii_digit()).collect();

        let luhn = luhn_valid(&digits);
        let length = (13..=19).contains(&digits.len());
        let issuer = matches!(digits.as_bytes().first(), Some(b'3' | b'4' | b'5' | b'6'));
        let not_test = !TEST_NUMBERS.contains(&digits.as_str());

        let mut confidence = 100.0;
        if !luhn {
            confidence -= 65.0;
        }
        if !length {
            confidence -= 15.0;
        }
        if !issuer {
            confidence -= 15.0;
        }
        if !not_test {
            confidence -= 10.0;
        }

        let mut checks = HashMap::new();
        checks.insert("luhn".to_string(), luhn);
        checks.insert("length".to_string(), length);
        checks.insert("issuer_prefix".to_string(), issuer);
        checks.insert("not_test_number".to_string(), not_test);
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
    fn luhn_accepts_valid_rejects_invalid() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("5555555555554444"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid("1234"));
    }

    #[test]
    fn valid_card_in_plaintext_scores_high() {
        let v = CreditCardValidator::new();
        let matches = v.validate_content("Pay to card 4111 1111 1111 1111\n", Path::new("payment.txt"));
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.match_type, "CREDIT_CARD");
        assert_eq!(m.line_number, Some(1));
        assert!(m.confidence >= 90.0, "confidence was {}", m.confidence);
        assert_eq!(m.meta("check_luhn").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn invalid_luhn_scores_below_forty() {
        let v = CreditCardValidator::new();
        let matches = v.validate_content("Number 4111 1111 1111 1112\n", Path::new("notes.txt"));
        // Either no match or a low-confidence one.
        for m in &matches {
            assert!(m.confidence < 40.0, "confidence was {}", m.confidence);
        }
    }

    #[test]
    fn negative_keywords_reduce_confidence() {
        let v = CreditCardValidator::new();
        let clean = v.validate_content("4242 4242 4242 4242\n", Path::new("a.txt"));
        let tagged = v.validate_content("order 4242 4242 4242 4242\n", Path::new("a.txt"));
        assert!(tagged[0].confidence < clean[0].confidence);
    }

    #[test]
    fn amex_grouping_matches() {
        let v = CreditCardValidator::new();
        let matches = v.validate_content("amex 3782 8224 6310 005\n", Path::new("a.txt"));
        assert_eq!(matches.len(), 1);
    }
}
