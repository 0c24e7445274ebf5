//! Person name validator.
//!
//! Capitalized-bigram heuristic with a stoplist of frequent non-name
//! capitalized words; honorifics on the same line are strong positive
//! context.

use crate::types::Match;
use crate::validators::{ConfidenceChecks, Validator, scan_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]{1,20} [A-Z][a-z]{1,20}\b").expect("static pattern"));

/// Frequent capitalized words that start sentences or name places, months,
/// and org terms rather than people.
const STOPWORDS: &[&str] = &[
    "The", "This", "That", "These", "Those", "United", "States", "New", "York", "North", "South", "East", "West",
    "January", "February", "March", "April", "June", "July", "August", "September", "October", "November",
    "December", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday", "Dear", "Best",
    "Kind", "Regards", "Thank", "Please", "Company", "Inc", "Corp", "Street", "Avenue", "Suite",
];

const POSITIVE: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "name:", "employee", "patient", "applicant", "signed", "attn",
    "sincerely",
];
const NEGATIVE: &[&str] = &["company", "product", "project", "street", "avenue", "city", "university"];

pub struct PersonNameValidator;

impl PersonNameValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PersonNameValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for PersonNameValidator {
    fn name(&self) -> &str {
        "person-name"
    }

    fn tag(&self) -> &str {
        "PERSON_NAME"
    }

    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match> {
        scan_text(self, &PATTERN, text, source)
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let words: Vec<&str> = match_text.split_whitespace().collect();

        let no_stopwords = !words.iter().any(|w| STOPWORDS.contains(w));
        let plausible_lengths = words.iter().all(|w| (2..=21).contains(&w.len()));
        let two_words = words.len() == 2;

        // A bigram alone is weak evidence; the base sits low and context
        // pulls it up.
        let mut confidence = 70.0;
        if !no_stopwords {
            confidence -= 45.0;
        }
        if !plausible_lengths {
            confidence -= 15.0;
        }
        if !two_words {
            confidence -= 10.0;
        }

        let mut checks = HashMap::new();
        checks.insert("no_stopwords".to_string(), no_stopwords);
        checks.insert("plausible_lengths".to_string(), plausible_lengths);
        checks.insert("two_words".to_string(), two_words);
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
    fn honorific_context_boosts_name() {
        let v = PersonNameValidator::new();
        let matches = v.validate_content("Dr. Maria Lopez will attend\n", Path::new("a.txt"));
        let name = matches.iter().find(|m| m.text == "Maria Lopez").expect("name match");
        assert!(name.confidence > 70.0);
    }

    #[test]
    fn stopword_bigrams_are_penalized() {
        let v = PersonNameValidator::new();
        let (conf, checks) = v.calculate_confidence("United States");
        assert_eq!(checks["no_stopwords"], false);
        assert!(conf <= 25.0);
    }

    #[test]
    fn base_confidence_is_conservative() {
        let v = PersonNameValidator::new();
        let (conf, _) = v.calculate_confidence("Jordan Smith");
        assert_eq!(conf, 70.0);
    }
}
