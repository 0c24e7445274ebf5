//! Core content model shared across the scanner.
//!
//! The types here form the contract between the pipeline stages: a
//! preprocessor turns a file into a [`ProcessedContent`], the content router
//! derives a [`RoutedContent`] view for the dual-path bridge, validators emit
//! [`Match`] records, and the redaction engine records its work as
//! [`RedactionMapping`]s inside a [`RedactionResult`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The closed set of preprocessor families that can produce metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessorType {
    Image,
    Document,
    Office,
    Audio,
    Video,
}

impl PreprocessorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreprocessorType::Image => "image",
            PreprocessorType::Document => "document",
            PreprocessorType::Office => "office",
            PreprocessorType::Audio => "audio",
            PreprocessorType::Video => "video",
        }
    }
}

impl std::fmt::Display for PreprocessorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed piece of extracted metadata.
///
/// `content` is a flat key→value map serialized as `Key: Value` lines, in the
/// order the preprocessor discovered the keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub preprocessor_type: PreprocessorType,
    pub preprocessor_name: String,
    pub source_file: PathBuf,
    pub content: String,
}

impl MetadataItem {
    /// Build an item from ordered key/value pairs.
    pub fn from_pairs<P: AsRef<Path>>(
        preprocessor_type: PreprocessorType,
        preprocessor_name: &str,
        source_file: P,
        pairs: &[(String, String)],
    ) -> Self {
        let content = pairs
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            preprocessor_type,
            preprocessor_name: preprocessor_name.to_string(),
            source_file: source_file.as_ref().to_path_buf(),
            content,
        }
    }

    /// Iterate the `Key: Value` lines as pairs. Lines without a separator are
    /// skipped.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.content.lines().filter_map(|line| {
            line.split_once(':')
                .map(|(k, v)| (k.trim(), v.trim()))
                .filter(|(k, _)| !k.is_empty())
        })
    }

    /// Look up a single key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Document statistics computed by a preprocessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub word_count: usize,
    pub char_count: usize,
    pub page_count: usize,
}

impl DocumentStats {
    pub fn from_text(text: &str, page_count: usize) -> Self {
        Self {
            word_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
            page_count,
        }
    }
}

/// A preprocessor's output: normalized body text plus typed metadata.
///
/// Invariant: when `success` is true, at least one of `text` /
/// `metadata_items` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedContent {
    pub original_path: PathBuf,
    pub text: String,
    pub metadata_items: Vec<MetadataItem>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stats: DocumentStats,
}

impl ProcessedContent {
    /// A successful result. `error` may still carry a non-fatal cause (for
    /// example an encrypted PDF that produced no body but valid metadata).
    pub fn success<P: AsRef<Path>>(path: P, text: String, metadata_items: Vec<MetadataItem>) -> Self {
        let stats = DocumentStats::from_text(&text, if text.is_empty() { 0 } else { 1 });
        Self {
            original_path: path.as_ref().to_path_buf(),
            text,
            metadata_items,
            success: true,
            error: None,
            stats,
        }
    }

    /// A failed result carrying the cause.
    pub fn failure<P: AsRef<Path>>(path: P, error: String) -> Self {
        Self {
            original_path: path.as_ref().to_path_buf(),
            text: String::new(),
            metadata_items: Vec::new(),
            success: false,
            error: Some(error),
            stats: DocumentStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.metadata_items.is_empty()
    }
}

/// The dual-path bridge's view of a `ProcessedContent`.
///
/// Immutable after creation: the body goes to the text validators, the
/// metadata items to the metadata validator.
#[derive(Debug, Clone)]
pub struct RoutedContent {
    pub document_body: String,
    pub metadata: Vec<MetadataItem>,
}

impl RoutedContent {
    pub fn from_processed(content: &ProcessedContent) -> Self {
        Self {
            document_body: content.text.clone(),
            metadata: content.metadata_items.clone(),
        }
    }
}

/// Capture of the text surrounding a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchContext {
    /// The full line the match occurred on.
    pub full_line: String,
    /// Up to two lines before the match line.
    pub before: String,
    /// Up to two lines after the match line.
    pub after: String,
    pub positive_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
    /// Signed confidence delta contributed by context analysis.
    pub context_delta: f64,
}

/// A scalar value carried in the cross-component metadata map.
///
/// Mixed scalar types are represented as a tagged variant rather than an open
/// type-erased container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}
impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}
impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}
impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}
impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Float(f) => Some(*f),
            MetaValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A single finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    /// Validator tag, e.g. `CREDIT_CARD`.
    #[serde(rename = "type")]
    pub match_type: String,
    /// Literal matched substring. Zeroed after formatting.
    pub text: String,
    /// 1-based line number; absent for metadata-derived matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    /// Byte offset of the match start within its line.
    pub offset: usize,
    /// Confidence in `[0, 100]` after all adjustments.
    pub confidence: f64,
    /// Name of the producing validator.
    pub validator: String,
    /// File the match was found in.
    pub file: PathBuf,
    pub context: MatchContext,
    /// Provenance and calibration records.
    #[serde(default)]
    pub metadata: HashMap<String, MetaValue>,
}

impl Match {
    /// Overwrite the matched text in place to limit sensitive-data residency.
    ///
    /// The buffer is refilled with NUL bytes before being emptied so the
    /// original value does not linger in the retained allocation.
    pub fn scrub(&mut self) {
        let len = self.text.len();
        self.text.clear();
        self.text.extend(std::iter::repeat_n('\0', len));
        self.text.clear();
        self.text.shrink_to_fit();
    }

    pub fn set_meta<K: Into<String>, V: Into<MetaValue>>(&mut self, key: K, value: V) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn meta(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }
}

/// A match hidden by a suppression rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressedMatch {
    #[serde(flatten)]
    pub matched: Match,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expired: bool,
}

/// Inferred document domain used by the confidence engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Healthcare,
    Financial,
    HrPayroll,
    Legal,
    Technology,
    #[default]
    General,
}

/// Per-file insight derived before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextInsights {
    pub domain: Domain,
    pub document_type: String,
    pub domain_confidence: f64,
    pub semantic_tags: Vec<String>,
    pub signal_hints: Vec<String>,
}

/// Redaction strategy identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionStrategyKind {
    #[default]
    Simple,
    FormatPreserving,
    Synthetic,
}

impl RedactionStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedactionStrategyKind::Simple => "simple",
            RedactionStrategyKind::FormatPreserving => "format_preserving",
            RedactionStrategyKind::Synthetic => "synthetic",
        }
    }
}

/// Record of one redaction within the intermediate text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionMapping {
    /// 1-based line of the original match.
    pub line: u32,
    /// Byte range within the intermediate text.
    pub start: usize,
    pub end: usize,
    pub replacement: String,
    pub data_type: String,
    pub strategy: RedactionStrategyKind,
    pub confidence: f64,
    /// Hash of the surrounding context with the match replaced by `[HIDDEN]`.
    pub verification_hash: String,
}

/// Final per-file redaction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub mappings: Vec<RedactionMapping>,
    pub duration: Duration,
    /// Mean of mapping confidences, normalized to `[0, 1]`; 1.0 when empty.
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RedactionResult {
    pub fn overall_confidence(mappings: &[RedactionMapping]) -> f64 {
        if mappings.is_empty() {
            return 1.0;
        }
        mappings.iter().map(|m| m.confidence / 100.0).sum::<f64>() / mappings.len() as f64
    }
}

/// A structured skip reason produced by the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipReason {
    pub path: PathBuf,
    pub error_kind: crate::error::ErrorKind,
    pub message: String,
    /// Quiet skips are consumed by the driver without a warning.
    pub silent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_item_entries_round_trip() {
        let item = MetadataItem::from_pairs(
            PreprocessorType::Video,
            "video-metadata",
            "/tmp/trip.mov",
            &[
                ("GPS_Coordinates".to_string(), "36.350600, -82.698500".to_string()),
                ("Make".to_string(), "Apple".to_string()),
            ],
        );
        let pairs: Vec<_> = item.entries().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(item.get("Make"), Some("Apple"));
        assert_eq!(item.get("GPS_Coordinates"), Some("36.350600, -82.698500"));
    }

    #[test]
    fn processed_content_empty_check() {
        let ok = ProcessedContent::success("/tmp/a.txt", "hello".to_string(), vec![]);
        assert!(ok.success);
        assert!(!ok.is_empty());
        assert_eq!(ok.stats.word_count, 1);

        let failed = ProcessedContent::failure("/tmp/a.bin", "unsupported".to_string());
        assert!(!failed.success);
        assert!(failed.is_empty());
    }

    #[test]
    fn match_scrub_clears_text() {
        let mut m = Match {
            match_type: "SSN".to_string(),
            text: "123-45-6789".to_string(),
            line_number: Some(1),
            offset: 0,
            confidence: 90.0,
            validator: "ssn".to_string(),
            file: PathBuf::from("/tmp/x.txt"),
            context: MatchContext::default(),
            metadata: HashMap::new(),
        };
        m.scrub();
        assert!(m.text.is_empty());
    }

    #[test]
    fn redaction_confidence_mean() {
        assert_eq!(RedactionResult::overall_confidence(&[]), 1.0);
        let mapping = |c| RedactionMapping {
            line: 1,
            start: 0,
            end: 4,
            replacement: "[X]".to_string(),
            data_type: "SSN".to_string(),
            strategy: RedactionStrategyKind::Simple,
            confidence: c,
            verification_hash: String::new(),
        };
        let mean = RedactionResult::overall_confidence(&[mapping(80.0), mapping(100.0)]);
        assert!((mean - 0.9).abs() < 1e-9);
    }

    #[test]
    fn meta_value_is_tagged_scalar() {
        let mut m: HashMap<String, MetaValue> = HashMap::new();
        m.insert("cross_path_correlation".to_string(), true.into());
        m.insert("original_confidence".to_string(), 88.5.into());
        assert_eq!(m["cross_path_correlation"].as_bool(), Some(true));
        assert_eq!(m["original_confidence"].as_f64(), Some(88.5));
    }
}
