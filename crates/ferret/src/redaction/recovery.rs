//! Redaction failure recovery.
//!
//! On per-file redaction failure the engine walks a fixed ladder: reprocess
//! with the same strategy, fall back to the simple strategy, attempt a
//! partial redaction restricted to high-confidence matches, copy the
//! original verbatim with a prominent warning, and finally write a skip
//! placeholder. The ladder is bounded by a retry count and a total recovery
//! timeout.

use crate::types::RedactionStrategyKind;
use std::time::Duration;

/// Matches below this confidence are dropped in a partial redaction.
pub const PARTIAL_MIN_CONFIDENCE: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    /// Reprocess with the original strategy.
    Retry(RedactionStrategyKind),
    /// Fall back to the simple strategy.
    SimpleFallback,
    /// Simple strategy over matches with confidence >= 80 only.
    Partial,
    /// Copy the original verbatim, warning prominently.
    VerbatimCopy,
    /// Write a placeholder recording the skip.
    SkipPlaceholder,
}

#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    pub max_retries: usize,
    pub total_timeout: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            total_timeout: Duration::from_secs(60),
        }
    }
}

impl RecoveryPolicy {
    /// The ordered steps to attempt after the primary attempt failed.
    pub fn ladder(&self, primary: RedactionStrategyKind) -> Vec<RecoveryStep> {
        let mut steps = Vec::new();
        for _ in 0..self.max_retries {
            steps.push(RecoveryStep::Retry(primary));
        }
        if primary != RedactionStrategyKind::Simple {
            steps.push(RecoveryStep::SimpleFallback);
        }
        steps.push(RecoveryStep::Partial);
        steps.push(RecoveryStep::VerbatimCopy);
        steps.push(RecoveryStep::SkipPlaceholder);
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_order_for_synthetic_primary() {
        let policy = RecoveryPolicy::default();
        let steps = policy.ladder(RedactionStrategyKind::Synthetic);
        assert_eq!(
            steps,
            vec![
                RecoveryStep::Retry(RedactionStrategyKind::Synthetic),
                RecoveryStep::SimpleFallback,
                RecoveryStep::Partial,
                RecoveryStep::VerbatimCopy,
                RecoveryStep::SkipPlaceholder,
            ]
        );
    }

    #[test]
    fn simple_primary_skips_redundant_fallback() {
        let policy = RecoveryPolicy::default();
        let steps = policy.ladder(RedactionStrategyKind::Simple);
        assert!(!steps.contains(&RecoveryStep::SimpleFallback));
        assert_eq!(steps[0], RecoveryStep::Retry(RedactionStrategyKind::Simple));
    }

    #[test]
    fn retry_count_is_bounded() {
        let policy = RecoveryPolicy {
            max_retries: 3,
            total_timeout: Duration::from_secs(10),
        };
        let steps = policy.ladder(RedactionStrategyKind::FormatPreserving);
        let retries = steps.iter().filter(|s| matches!(s, RecoveryStep::Retry(_))).count();
        assert_eq!(retries, 3);
    }
}
