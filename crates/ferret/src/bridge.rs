//! Dual-path validator bridge.
//!
//! Splits a [`ProcessedContent`] into two concurrent validation streams:
//! body text goes to every registered non-metadata validator, metadata items
//! go to the metadata validator only. The paths rejoin before the per-file
//! job returns. When both paths produce at least one match, every match
//! receives a single +5 cross-path correlation boost.

use crate::error::{FerretError, Result};
use crate::types::{Match, MetadataItem, ProcessedContent, RoutedContent};
use crate::validators::{MetadataValidator, Validator};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Confidence added to every match when both paths fire on the same file.
pub const CROSS_PATH_BOOST: f64 = 5.0;

/// Outcome of validating one file.
#[derive(Debug, Default)]
pub struct BridgeOutcome {
    pub matches: Vec<Match>,
    /// Set when exactly one path failed; its sibling's results are returned.
    pub partial_failure: Option<String>,
    pub used_fallback: bool,
    pub cross_path_correlated: bool,
}

pub struct ValidatorBridge {
    validators: Vec<Arc<dyn Validator>>,
    metadata_validator: Arc<MetadataValidator>,
    fallback_count: AtomicU64,
}

impl ValidatorBridge {
    pub fn new(validators: Vec<Arc<dyn Validator>>, metadata_validator: Arc<MetadataValidator>) -> Self {
        Self {
            validators,
            metadata_validator,
            fallback_count: AtomicU64::new(0),
        }
    }

    /// How often routing failed and the fallback path ran.
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    /// Split content into the two validation streams.
    ///
    /// Fails on malformed input (an unsuccessful `ProcessedContent` that
    /// still carries text), which sends the caller down the fallback path.
    fn route_content(content: &ProcessedContent) -> Result<RoutedContent> {
        if !content.success && !content.text.is_empty() {
            return Err(FerretError::routing("unsuccessful content still carries body text")
                .with_path(&content.original_path));
        }
        Ok(RoutedContent::from_processed(content))
    }

    /// Validate one file's content through both paths.
    pub async fn validate(&self, content: &ProcessedContent) -> Result<BridgeOutcome> {
        if content.is_empty() {
            // No extracted content: empty output, no error surfaced.
            return Ok(BridgeOutcome::default());
        }

        let routed = match Self::route_content(content) {
            Ok(routed) => routed,
            Err(err) => {
                debug!(path = %content.original_path.display(), error = %err, "content routing failed, using fallback");
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                return Ok(self.validate_fallback(content));
            }
        };

        let body = routed.document_body;
        let metadata = routed.metadata;
        let source: PathBuf = content.original_path.clone();

        let body_validators = self.validators.clone();
        let body_source = source.clone();
        let body_task = tokio::task::spawn_blocking(move || {
            let mut matches = Vec::new();
            for validator in &body_validators {
                matches.extend(validator.validate_content(&body, &body_source));
            }
            matches
        });

        let metadata_validator = Arc::clone(&self.metadata_validator);
        let metadata_task = tokio::task::spawn_blocking(move || {
            let mut matches = Vec::new();
            for item in &metadata {
                matches.extend(metadata_validator.validate_metadata_content(item));
            }
            matches
        });

        let (body_result, metadata_result) = tokio::join!(body_task, metadata_task);

        let mut outcome = BridgeOutcome::default();
        match (body_result, metadata_result) {
            (Ok(body_matches), Ok(metadata_matches)) => {
                let correlated = !body_matches.is_empty() && !metadata_matches.is_empty();
                outcome.matches = body_matches;
                outcome.matches.extend(metadata_matches);
                if correlated {
                    apply_cross_path_boost(&mut outcome.matches);
                    outcome.cross_path_correlated = true;
                }
            }
            (Ok(body_matches), Err(err)) => {
                warn!(path = %source.display(), error = %err, "metadata path failed");
                outcome.matches = body_matches;
                outcome.partial_failure = Some(format!("metadata path failed: {}", err));
            }
            (Err(err), Ok(metadata_matches)) => {
                warn!(path = %source.display(), error = %err, "body path failed");
                outcome.matches = metadata_matches;
                outcome.partial_failure = Some(format!("body path failed: {}", err));
            }
            (Err(body_err), Err(metadata_err)) => {
                return Err(FerretError::validation(format!(
                    "both validation paths failed: body: {}; metadata: {}",
                    body_err, metadata_err
                ))
                .with_path(&source));
            }
        }
        Ok(outcome)
    }

    /// Fallback mode: run every validator against the original body text and
    /// aggregate.
    fn validate_fallback(&self, content: &ProcessedContent) -> BridgeOutcome {
        let mut matches = Vec::new();
        for validator in &self.validators {
            matches.extend(validator.validate_content(&content.text, &content.original_path));
        }
        for item in metadata_of(content) {
            matches.extend(self.metadata_validator.validate_metadata_content(item));
        }
        BridgeOutcome {
            matches,
            partial_failure: None,
            used_fallback: true,
            cross_path_correlated: false,
        }
    }
}

fn metadata_of(content: &ProcessedContent) -> impl Iterator<Item = &MetadataItem> {
    content.metadata_items.iter()
}

/// Apply the +5 correlation boost, clamped to 100, exactly once per file.
fn apply_cross_path_boost(matches: &mut [Match]) {
    for m in matches.iter_mut() {
        if m.meta("cross_path_correlation").and_then(|v| v.as_bool()) == Some(true) {
            continue;
        }
        m.confidence = (m.confidence + CROSS_PATH_BOOST).min(100.0);
        m.set_meta("cross_path_correlation", true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetadataItem, PreprocessorType};
    use crate::validators::default_validators;

    fn bridge() -> ValidatorBridge {
        ValidatorBridge::new(default_validators(), Arc::new(MetadataValidator::permissive()))
    }

    fn content_with(text: &str, items: Vec<MetadataItem>) -> ProcessedContent {
        ProcessedContent::success("/tmp/mixed.jpg", text.to_string(), items)
    }

    #[tokio::test]
    async fn empty_content_produces_no_matches_and_no_error() {
        let bridge = bridge();
        let mut content = content_with("x", vec![]);
        content.text.clear();
        content.metadata_items.clear();
        let outcome = bridge.validate(&content).await.unwrap();
        assert!(outcome.matches.is_empty());
        assert!(outcome.partial_failure.is_none());
    }

    #[tokio::test]
    async fn cross_path_boost_applied_exactly_once() {
        let bridge = bridge();
        let item = MetadataItem::from_pairs(
            PreprocessorType::Image,
            "image",
            "/tmp/mixed.jpg",
            &[("CameraModel".to_string(), "iPhone 14".to_string())],
        );
        let content = content_with("Pay to card 4242 4242 4242 4242\n", vec![item]);

        let outcome = bridge.validate(&content).await.unwrap();
        assert!(outcome.cross_path_correlated);
        let card = outcome.matches.iter().find(|m| m.match_type == "CREDIT_CARD").unwrap();
        let device = outcome.matches.iter().find(|m| m.match_type == "METADATA").unwrap();
        assert_eq!(card.meta("cross_path_correlation").and_then(|v| v.as_bool()), Some(true));
        // Metadata device field scores 80; the boost lands it at exactly 85.
        assert_eq!(device.confidence, 85.0);
    }

    #[tokio::test]
    async fn single_path_content_gets_no_boost() {
        let bridge = bridge();
        let content = content_with("Pay to card 4242 4242 4242 4242\n", vec![]);
        let outcome = bridge.validate(&content).await.unwrap();
        assert!(!outcome.cross_path_correlated);
        for m in &outcome.matches {
            assert!(m.meta("cross_path_correlation").is_none());
        }
    }

    #[tokio::test]
    async fn boost_is_idempotent_on_reapplication() {
        let mut matches = vec![Match {
            match_type: "SSN".to_string(),
            text: "123-45-6789".to_string(),
            line_number: Some(1),
            offset: 0,
            confidence: 90.0,
            validator: "ssn".to_string(),
            file: "/tmp/a.txt".into(),
            context: Default::default(),
            metadata: Default::default(),
        }];
        apply_cross_path_boost(&mut matches);
        apply_cross_path_boost(&mut matches);
        assert_eq!(matches[0].confidence, 95.0);
    }

    #[tokio::test]
    async fn routing_failure_uses_fallback() {
        let bridge = bridge();
        let mut content = content_with("SSN 123-45-6789\n", vec![]);
        content.success = false;
        content.error = Some("parse ended early".to_string());

        let outcome = bridge.validate(&content).await.unwrap();
        assert!(outcome.used_fallback);
        assert!(outcome.matches.iter().any(|m| m.match_type == "SSN"));
        assert_eq!(bridge.fallback_count(), 1);
    }
}
