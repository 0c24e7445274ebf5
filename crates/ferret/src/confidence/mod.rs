//! Confidence engine.
//!
//! Three layers applied in order after a validator emits its raw matches:
//! context adjustment from the inferred document domain, cross-validator
//! correlation signals, and statistical calibration. Signals and calibration
//! state are session-only; nothing persists between runs.

use crate::types::{ContextInsights, Domain, Match};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

pub mod calibration;
pub mod context_analyzer;
pub mod correlation;

pub use correlation::CorrelationSignal;

/// Default `(domain, validator tag) -> delta` table. The values are data:
/// deployments may override the whole table at construction.
fn default_adjustments() -> HashMap<(Domain, &'static str), f64> {
    let mut table = HashMap::new();
    table.insert((Domain::Financial, "CREDIT_CARD"), 5.0);
    table.insert((Domain::Financial, "SSN"), 3.0);
    table.insert((Domain::Financial, "PERSON_NAME"), 2.0);
    table.insert((Domain::HrPayroll, "SSN"), 5.0);
    table.insert((Domain::HrPayroll, "PERSON_NAME"), 4.0);
    table.insert((Domain::HrPayroll, "PHONE"), 2.0);
    table.insert((Domain::Healthcare, "PERSON_NAME"), 5.0);
    table.insert((Domain::Healthcare, "SSN"), 3.0);
    table.insert((Domain::Healthcare, "PHONE"), 2.0);
    table.insert((Domain::Legal, "PERSON_NAME"), 3.0);
    table.insert((Domain::Technology, "SECRETS"), 5.0);
    table.insert((Domain::Technology, "IP_ADDRESS"), 3.0);
    table.insert((Domain::Technology, "PERSON_NAME"), -5.0);
    table.insert((Domain::Technology, "PHONE"), -3.0);
    table
}

pub struct ConfidenceEngine {
    adjustments: HashMap<(Domain, &'static str), f64>,
    signals: Mutex<Vec<CorrelationSignal>>,
}

impl ConfidenceEngine {
    pub fn new() -> Self {
        Self {
            adjustments: default_adjustments(),
            signals: Mutex::new(Vec::new()),
        }
    }

    pub fn with_adjustments(adjustments: HashMap<(Domain, &'static str), f64>) -> Self {
        Self {
            adjustments,
            signals: Mutex::new(Vec::new()),
        }
    }

    /// Session-only signal log snapshot.
    pub fn signals(&self) -> Vec<CorrelationSignal> {
        self.signals.lock().clone()
    }

    /// Run all three layers over one file's matches. Matches whose final
    /// confidence is not positive are dropped.
    pub fn apply(&self, file: &Path, body_text: &str, matches: &mut Vec<Match>) -> ContextInsights {
        let mut insights = context_analyzer::analyze(body_text);

        // Layer 1: domain-driven adjustment.
        for m in matches.iter_mut() {
            let delta = self
                .adjustments
                .get(&(insights.domain, m.match_type.as_str()))
                .copied()
                .unwrap_or(0.0);
            if delta != 0.0 {
                let original = m.confidence;
                m.confidence = (original + delta).clamp(0.0, 100.0);
                m.set_meta("original_confidence", original);
                m.set_meta("confidence_adjustment", delta);
            }
        }

        // Layer 2: cross-validator correlation.
        if let Some(signal) = correlation::evaluate(&file.to_path_buf(), matches, insights.domain) {
            correlation::apply(&signal, matches);
            insights.signal_hints = signal.patterns.iter().map(|p| p.to_string()).collect();
            self.signals.lock().push(signal);
        }

        // Layer 3: statistical calibration.
        for m in matches.iter_mut() {
            calibration::calibrate(m);
        }

        matches.retain(|m| m.confidence > 0.0);
        insights
    }
}

impl Default for ConfidenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

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
            metadata: Map::new(),
        }
    }

    #[test]
    fn domain_adjustment_records_original() {
        let engine = ConfidenceEngine::new();
        let mut matches = vec![fake_match("CREDIT_CARD", "credit-card", 80.0)];
        let text = "invoice payment bank account statement balance";
        engine.apply(Path::new("/tmp/a.txt"), text, &mut matches);
        let m = &matches[0];
        assert_eq!(m.meta("original_confidence").and_then(|v| v.as_f64()), Some(80.0));
        assert_eq!(m.meta("confidence_adjustment").and_then(|v| v.as_f64()), Some(5.0));
        assert!(m.confidence > 80.0);
    }

    #[test]
    fn signals_are_session_scoped_and_inspectable() {
        let engine = ConfidenceEngine::new();
        let mut matches = vec![
            fake_match("CREDIT_CARD", "credit-card", 90.0),
            fake_match("SSN", "ssn", 85.0),
        ];
        engine.apply(Path::new("/tmp/a.txt"), "invoice payment bank balance", &mut matches);
        let signals = engine.signals();
        assert_eq!(signals.len(), 1);
        assert!(signals[0].patterns.contains(&"financial_correlation"));
    }

    #[test]
    fn non_positive_matches_are_dropped() {
        let engine = ConfidenceEngine::new();
        let mut matches = vec![fake_match("PHONE", "phone", 0.5)];
        engine.apply(Path::new("/tmp/a.txt"), "", &mut matches);
        // 0.5 * 0.95 is still positive; a zero match would be dropped.
        assert_eq!(matches.len(), 1);

        let mut zeroed = vec![fake_match("PHONE", "phone", 0.0)];
        engine.apply(Path::new("/tmp/a.txt"), "", &mut zeroed);
        assert!(zeroed.is_empty());
    }

    #[test]
    fn calibration_runs_last() {
        let engine = ConfidenceEngine::new();
        let mut matches = vec![fake_match("EMAIL", "email", 89.0)];
        engine.apply(Path::new("/tmp/a.txt"), "", &mut matches);
        // 89 is in the >= 70 band: 89 * 1.01 = 89.89.
        assert!((matches[0].confidence - 89.89).abs() < 1e-9);
    }
}
