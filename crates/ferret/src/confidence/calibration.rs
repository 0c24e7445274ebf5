//! Statistical calibration of final confidences.
//!
//! Confidence bands get a small multiplicative correction: strong matches are
//! nudged up, weak ones down. State is session-only.

use crate::types::Match;

/// Band factors, highest band first.
const BANDS: &[(f64, f64)] = &[(90.0, 1.02), (70.0, 1.01), (50.0, 0.98), (0.0, 0.95)];

pub fn factor_for(confidence: f64) -> f64 {
    for (floor, factor) in BANDS {
        if confidence >= *floor {
            return *factor;
        }
    }
    1.0
}

/// Calibrate one match, recording the applied delta.
pub fn calibrate(m: &mut Match) {
    let before = m.confidence;
    m.confidence = (before * factor_for(before)).clamp(0.0, 100.0);
    m.set_meta("calibration_delta", m.confidence - before);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fake_match(confidence: f64) -> Match {
        Match {
            match_type: "EMAIL".to_string(),
            text: "x".to_string(),
            line_number: Some(1),
            offset: 0,
            confidence,
            validator: "email".to_string(),
            file: "/tmp/a.txt".into(),
            context: Default::default(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn band_factors() {
        assert_eq!(factor_for(95.0), 1.02);
        assert_eq!(factor_for(90.0), 1.02);
        assert_eq!(factor_for(75.0), 1.01);
        assert_eq!(factor_for(55.0), 0.98);
        assert_eq!(factor_for(30.0), 0.95);
    }

    #[test]
    fn calibration_clamps_to_hundred() {
        let mut m = fake_match(99.5);
        calibrate(&mut m);
        assert_eq!(m.confidence, 100.0);
    }

    #[test]
    fn delta_is_recorded() {
        let mut m = fake_match(80.0);
        calibrate(&mut m);
        assert!((m.confidence - 80.8).abs() < 1e-9);
        let delta = m.meta("calibration_delta").and_then(|v| v.as_f64()).unwrap();
        assert!((delta - 0.8).abs() < 1e-9);
    }

    #[test]
    fn weak_matches_are_pushed_down() {
        let mut m = fake_match(40.0);
        calibrate(&mut m);
        assert_eq!(m.confidence, 38.0);
    }
}
