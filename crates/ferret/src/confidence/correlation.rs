//! Cross-validator correlation signals.
//!
//! Per file, matches are grouped by validator; when two or more validators
//! fired, a session-only signal is recorded and its weight feeds a small
//! confidence boost. Nothing is persisted between runs.

use crate::types::{Domain, Match};
use std::collections::HashSet;
use std::path::PathBuf;

/// Multiplier from signal weight to confidence points.
pub const WEIGHT_TO_CONFIDENCE: f64 = 10.0;

/// One session-only correlation record.
#[derive(Debug, Clone)]
pub struct CorrelationSignal {
    pub file: PathBuf,
    pub validators: Vec<String>,
    pub weight: f64,
    pub patterns: Vec<&'static str>,
}

/// Evaluate the codified correlation patterns for one file's matches.
///
/// Returns `None` when fewer than two validators produced matches.
pub fn evaluate(file: &PathBuf, matches: &[Match], domain: Domain) -> Option<CorrelationSignal> {
    let validators: HashSet<&str> = matches.iter().map(|m| m.validator.as_str()).collect();
    if validators.len() < 2 {
        return None;
    }

    let mut weight = 0.0;
    let mut patterns = Vec::new();

    // Pair presence.
    weight += 0.10;
    patterns.push("pair_presence");

    // Multi-category presence.
    if validators.len() >= 3 {
        weight += 0.15;
        patterns.push("multi_category");
    }

    // Financial correlation: card and SSN together in a financial or
    // HR/payroll document.
    let has_card = matches.iter().any(|m| m.match_type == "CREDIT_CARD");
    let has_ssn = matches.iter().any(|m| m.match_type == "SSN");
    if has_card && has_ssn && matches!(domain, Domain::Financial | Domain::HrPayroll) {
        weight += 0.20;
        patterns.push("financial_correlation");
    }

    Some(CorrelationSignal {
        file: file.clone(),
        validators: validators.into_iter().map(String::from).collect(),
        weight,
        patterns,
    })
}

/// Apply a signal's boost to the file's matches.
pub fn apply(signal: &CorrelationSignal, matches: &mut [Match]) {
    let boost = signal.weight * WEIGHT_TO_CONFIDENCE;
    for m in matches.iter_mut() {
        m.confidence = (m.confidence + boost).min(100.0);
        m.set_meta("cross_validator_signal", signal.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fake_match(match_type: &str, validator: &str, confidence: f64) -> Match {
        Match {
            match_type: match_type.to_string(),
            text: "x".to_string(),
            line_number: Some(1),
            offset: 0,
            confidence,
            validator: validator.to_string(),
            file: "/tmp/a.txt".into(),
            context: Default::default(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn single_validator_yields_no_signal() {
        let matches = vec![fake_match("SSN", "ssn", 90.0), fake_match("SSN", "ssn", 85.0)];
        assert!(evaluate(&"/tmp/a.txt".into(), &matches, Domain::General).is_none());
    }

    #[test]
    fn pair_presence_weight() {
        let matches = vec![fake_match("SSN", "ssn", 90.0), fake_match("EMAIL", "email", 80.0)];
        let signal = evaluate(&"/tmp/a.txt".into(), &matches, Domain::General).unwrap();
        assert!((signal.weight - 0.10).abs() < 1e-9);
    }

    #[test]
    fn financial_pattern_stacks() {
        let matches = vec![
            fake_match("CREDIT_CARD", "credit-card", 95.0),
            fake_match("SSN", "ssn", 90.0),
            fake_match("EMAIL", "email", 80.0),
        ];
        let signal = evaluate(&"/tmp/a.txt".into(), &matches, Domain::Financial).unwrap();
        // pair + multi-category + financial = 0.10 + 0.15 + 0.20
        assert!((signal.weight - 0.45).abs() < 1e-9);
        assert_eq!(signal.patterns, vec!["pair_presence", "multi_category", "financial_correlation"]);
    }

    #[test]
    fn apply_boosts_and_records_weight() {
        let mut matches = vec![fake_match("SSN", "ssn", 98.0), fake_match("EMAIL", "email", 60.0)];
        let signal = evaluate(&"/tmp/a.txt".into(), &matches, Domain::General).unwrap();
        apply(&signal, &mut matches);
        assert_eq!(matches[0].confidence, 99.0);
        assert_eq!(matches[1].confidence, 61.0);
        assert!(matches[0].meta("cross_validator_signal").is_some());
    }
}
