//! Metadata validator.
//!
//! The only validator on the metadata path. It walks the `Key: Value` lines
//! of each [`MetadataItem`], routes every value to the matching pattern
//! (GPS coordinates, device identifiers, people, dates), and tags each
//! emitted match with its provenance. Which preprocessor types it accepts is
//! decided by a capability query injected at construction time, so there is
//! no back-reference to the file router.

use crate::types::{Match, MatchContext, MetadataItem, PreprocessorType};
use crate::validators::{ConfidenceChecks, Validator};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

static GPS_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}\.\d+, -?\d{1,3}\.\d+(?:, -?\d+\.\d+)?$").expect("static pattern"));
static DATE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}[-:/]\d{2}[-:/]\d{2}").expect("static pattern"));

/// Keys that identify the capturing device.
const DEVICE_KEYS: &[&str] = &["CameraMake", "CameraModel", "SerialNumber", "LensModel"];
/// Keys that identify a person.
const PERSON_KEYS: &[&str] = &["Artist", "Author", "Creator", "LastModifiedBy", "DisplayName"];
/// Keys recording when something happened.
const DATE_KEY_PREFIXES: &[&str] = &[
    "DateTime", "Created", "Modified", "CreationDate", "CreationTime", "RecordingDate", "EditDate",
];
const SOFTWARE_KEYS: &[&str] = &["Software", "Application"];

/// Capability query: can the router produce metadata of this type at all?
pub type CapabilityQuery = Arc<dyn Fn(PreprocessorType) -> bool + Send + Sync>;

pub struct MetadataValidator {
    capability: CapabilityQuery,
    disabled_types: Vec<PreprocessorType>,
}

impl MetadataValidator {
    pub fn new(capability: CapabilityQuery) -> Self {
        Self {
            capability,
            disabled_types: Vec::new(),
        }
    }

    /// A validator that accepts every type; used where no router is present.
    pub fn permissive() -> Self {
        Self::new(Arc::new(|_| true))
    }

    pub fn with_disabled_types(mut self, disabled: Vec<PreprocessorType>) -> Self {
        self.disabled_types = disabled;
        self
    }

    /// Whether content from this preprocessor family is accepted.
    pub fn accepts_type(&self, preprocessor_type: PreprocessorType) -> bool {
        !self.disabled_types.contains(&preprocessor_type) && (self.capability)(preprocessor_type)
    }

    /// Walk the `Key: Value` lines of one metadata item and surface the
    /// sensitive ones as matches.
    pub fn validate_metadata_content(&self, item: &MetadataItem) -> Vec<Match> {
        if !self.accepts_type(item.preprocessor_type) {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for (key, value) in item.entries() {
            if value.is_empty() {
                continue;
            }
            let Some(confidence) = score_field(key, value) else {
                continue;
            };

            let mut m = Match {
                match_type: "METADATA".to_string(),
                text: value.to_string(),
                line_number: None,
                offset: 0,
                confidence,
                validator: self.name().to_string(),
                file: item.source_file.clone(),
                context: MatchContext {
                    full_line: format!("{}: {}", key, value),
                    ..MatchContext::default()
                },
                metadata: HashMap::new(),
            };
            m.set_meta("preprocessor_type", item.preprocessor_type.as_str());
            m.set_meta("preprocessor_name", item.preprocessor_name.clone());
            m.set_meta("source_file", item.source_file.display().to_string());
            m.set_meta("metadata_field", key);
            matches.push(m);
        }
        matches
    }
}

/// Confidence per field category; `None` means the field is not sensitive.
fn score_field(key: &str, value: &str) -> Option<f64> {
    if key == "GPS_Coordinates" {
        return Some(if GPS_VALUE.is_match(value) { 95.0 } else { 70.0 });
    }
    if DEVICE_KEYS.contains(&key) {
        return Some(80.0);
    }
    if PERSON_KEYS.contains(&key) {
        return Some(75.0);
    }
    if DATE_KEY_PREFIXES.iter().any(|p| key.starts_with(p)) {
        return Some(if DATE_VALUE.is_match(value) { 60.0 } else { 45.0 });
    }
    if SOFTWARE_KEYS.contains(&key) {
        return Some(55.0);
    }
    None
}

impl Validator for MetadataValidator {
    fn name(&self) -> &str {
        "metadata"
    }

    fn tag(&self) -> &str {
        "METADATA"
    }

    /// The metadata validator does not scan body text.
    fn validate_content(&self, _text: &str, _source: &Path) -> Vec<Match> {
        Vec::new()
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let looks_gps = GPS_VALUE.is_match(match_text);
        let looks_date = DATE_VALUE.is_match(match_text);
        let confidence = if looks_gps {
            95.0
        } else if looks_date {
            60.0
        } else {
            50.0
        };
        let mut checks = HashMap::new();
        checks.insert("gps_format".to_string(), looks_gps);
        checks.insert("date_format".to_string(), looks_date);
        (confidence, checks)
    }

    fn positive_keywords(&self) -> &[&str] {
        &[]
    }

    fn negative_keywords(&self) -> &[&str] {
        &[]
    }
}
