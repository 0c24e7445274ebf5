//! Social media handle validator.

use crate::types::Match;
use crate::validators::{ConfidenceChecks, Validator, scan_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// `@handle` not preceded by a word character (which would make it an email
/// local part), plus profile URLs of the major platforms.
static HANDLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s(\[])@[A-Za-z0-9_]{3,30}\b").expect("static pattern"));
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:twitter\.com|x\.com|instagram\.com|github\.com|tiktok\.com|linkedin\.com/in)/[A-Za-z0-9_.\-]{2,40}\b")
        .expect("static pattern")
});

const POSITIVE: &[&str] = &["twitter", "instagram", "follow", "handle", "profile", "social", "dm", "tag"];
const NEGATIVE: &[&str] = &["email", "mailto", "decorator", "annotation", "@param", "@return"];

pub struct SocialMediaValidator;

impl SocialMediaValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SocialMediaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for SocialMediaValidator {
    fn name(&self) -> &str {
        "social-media"
    }

    fn tag(&self) -> &str {
        "SOCIAL_MEDIA"
    }

    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match> {
        let mut matches = scan_text(self, &HANDLE_PATTERN, text, source);
        // The leading separator is part of the regex match; trim it off the
        // recorded text.
        for m in &mut matches {
            if let Some(at) = m.text.find('@') {
                m.offset += at;
                m.text = m.text[at..].to_string();
            }
        }
        matches.extend(scan_text(self, &URL_PATTERN, text, source));
        matches
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let is_url = match_text.contains('/');
        let handle = match_text.trim_start_matches(|c: char| c != '@').trim_start_matches('@');

        let valid_syntax = if is_url {
            true
        } else {
            (3..=30).contains(&handle.len()) && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        let not_numeric_only = !handle.chars().all(|c| c.is_ascii_digit()) || is_url;

        let mut confidence = if is_url { 95.0 } else { 75.0 };
        if !valid_syntax {
            confidence -= 40.0;
        }
        if !not_numeric_only {
            confidence -= 20.0;
        }

        let mut checks = HashMap::new();
        checks.insert("valid_syntax".to_string(), valid_syntax);
        checks.insert("not_numeric_only".to_string(), not_numeric_only);
        checks.insert("profile_url".to_string(), is_url);
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
    fn bare_handle_matches() {
        let v = SocialMediaValidator::new();
        let matches = v.validate_content("follow @ferret_scan for updates\n", Path::new("a.txt"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "@ferret_scan");
    }

    #[test]
    fn email_local_part_is_not_a_handle() {
        let v = SocialMediaValidator::new();
        let matches = v.validate_content("write to maria@acme.com today\n", Path::new("a.txt"));
        assert!(matches.is_empty());
    }

    #[test]
    fn profile_url_scores_higher_than_bare_handle() {
        let v = SocialMediaValidator::new();
        let (url_conf, _) = v.calculate_confidence("github.com/octocat");
        let (handle_conf, _) = v.calculate_confidence("@octocat");
        assert!(url_conf > handle_conf);
    }
}
