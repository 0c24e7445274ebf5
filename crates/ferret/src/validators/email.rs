//! Email address validator.

use crate::types::Match;
use crate::validators::{ConfidenceChecks, Validator, scan_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b").expect("static pattern"));

const EXAMPLE_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "test.com", "localhost"];
const DISPOSABLE_DOMAINS: &[&str] = &["mailinator.com", "guerrillamail.com", "10minutemail.com", "trashmail.com"];

const POSITIVE: &[&str] = &["email", "e-mail", "contact", "mailto", "sender", "recipient", "cc:", "bcc:"];
const NEGATIVE: &[&str] = &["example", "sample", "placeholder", "noreply", "no-reply", "donotreply"];

pub struct EmailValidator;

impl EmailValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmailValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for EmailValidator {
    fn name(&self) -> &str {
        "email"
    }

    fn tag(&self) -> &str {
        "EMAIL"
    }

    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match> {
        scan_text(self, &PATTERN, text, source)
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let (local, domain) = match_text.split_once('@').unwrap_or((match_text, ""));
        let domain_lower = domain.to_lowercase();

        let domain_syntax = !domain.is_empty()
            && domain.contains('.')
            && !domain.contains("..")
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && domain.rsplit('.').next().is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));
        let local_length = !local.is_empty() && local.len() <= 64;
        let not_example = !EXAMPLE_DOMAINS.contains(&domain_lower.as_str());
        let not_disposable = !DISPOSABLE_DOMAINS.contains(&domain_lower.as_str());

        let mut confidence = 100.0;
        if !domain_syntax {
            confidence -= 40.0;
        }
        if !local_length {
            confidence -= 20.0;
        }
        if !not_example {
            confidence -= 30.0;
        }
        if !not_disposable {
            confidence -= 15.0;
        }

        let mut checks = HashMap::new();
        checks.insert("domain_syntax".to_string(), domain_syntax);
        checks.insert("local_length".to_string(), local_length);
        checks.insert("not_example_domain".to_string(), not_example);
        checks.insert("not_disposable".to_string(), not_disposable);
        (confidence, checks)
    }

    fn positive_keywords(&self) -> &[&str] {
        POSITIVE
    }

    fn negative_keywords(&self) -> &[&str] {
        NEGATIVE
    }
}
