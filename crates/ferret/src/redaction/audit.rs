//! Redaction audit log and verification hashing.

use crate::error::{FerretError, Result};
use crate::types::{MetaValue, RedactionMapping, RedactionStrategyKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Placeholder substituted for the matched text when hashing its context.
pub const HIDDEN_TOKEN: &str = "[HIDDEN]";
/// Context bytes taken on each side of the match.
pub const CONTEXT_WINDOW: usize = 20;

/// Hash of `original[start-20..start] + "[HIDDEN]" + original[end..end+20]`
/// with bounds clamping, hex-encoded.
pub fn context_hash(original: &str, start: usize, end: usize) -> String {
    let bytes = original.as_bytes();
    let before_start = start.saturating_sub(CONTEXT_WINDOW);
    let after_end = (end + CONTEXT_WINDOW).min(bytes.len());

    let mut hasher = Sha256::new();
    hasher.update(&bytes[before_start..start.min(bytes.len())]);
    hasher.update(HIDDEN_TOKEN.as_bytes());
    hasher.update(&bytes[end.min(bytes.len())..after_end]);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Replay the hash against the original content to detect tampering with the
/// recorded mapping.
pub fn verify_mapping(original: &str, mapping: &RedactionMapping) -> bool {
    context_hash(original, mapping.start, mapping.end) == mapping.verification_hash
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPosition {
    pub line: u32,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub file: PathBuf,
    pub data_type: String,
    pub strategy: RedactionStrategyKind,
    pub position: AuditPosition,
    pub verification_hash: String,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: HashMap<String, MetaValue>,
}

/// JSON audit document: `version`, `generated_at`, and the redactions array.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLog {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub redactions: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            version: 1,
            generated_at: Utc::now(),
            redactions: Vec::new(),
        }
    }

    pub fn record(&mut self, file: &Path, mapping: &RedactionMapping) {
        self.redactions.push(AuditEntry {
            file: file.to_path_buf(),
            data_type: mapping.data_type.clone(),
            strategy: mapping.strategy,
            position: AuditPosition {
                line: mapping.line,
                start: mapping.start,
                end: mapping.end,
            },
            verification_hash: mapping.verification_hash.clone(),
            confidence: mapping.confidence,
            metadata: HashMap::new(),
        });
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| FerretError::redaction(format!("failed to serialize audit log: {}", err)))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?).map_err(|err| FerretError::from(err).with_path(path))?;
        crate::redaction::output::restrict_file_permissions(path)?;
        Ok(())
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_window_clamped() {
        let text = "short";
        let a = context_hash(text, 0, 5);
        let b = context_hash(text, 0, 5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_ignores_the_matched_text_itself() {
        let before = "Pay to card 4111 1111 1111 1111 today";
        let after = "Pay to card 9999 9999 9999 9999 today";
        // Same surroundings, different match bytes: the hash must agree
        // because the match is replaced by the hidden token.
        assert_eq!(context_hash(before, 12, 31), context_hash(after, 12, 31));
    }

    #[test]
    fn verify_detects_tampered_position() {
        let text = "SSN 123-45-6789 on file";
        let mapping = RedactionMapping {
            line: 1,
            start: 4,
            end: 15,
            replacement: "[SSN-REDACTED]".to_string(),
            data_type: "SSN".to_string(),
            strategy: RedactionStrategyKind::Simple,
            confidence: 95.0,
            verification_hash: context_hash(text, 4, 15),
        };
        assert!(verify_mapping(text, &mapping));

        let mut tampered = mapping.clone();
        tampered.start = 0;
        assert!(!verify_mapping(text, &tampered));
    }

    #[test]
    fn audit_log_serializes_contract_fields() {
        let mut log = AuditLog::new();
        let mapping = RedactionMapping {
            line: 3,
            start: 10,
            end: 21,
            replacement: "[SSN-REDACTED]".to_string(),
            data_type: "SSN".to_string(),
            strategy: RedactionStrategyKind::Simple,
            confidence: 92.0,
            verification_hash: "abc".to_string(),
        };
        log.record(Path::new("/tmp/hr.txt"), &mapping);
        let json = log.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value["generated_at"].is_string());
        assert_eq!(value["redactions"][0]["data_type"], "SSN");
        assert_eq!(value["redactions"][0]["position"]["line"], 3);
        assert_eq!(value["redactions"][0]["strategy"], "simple");
    }
}
