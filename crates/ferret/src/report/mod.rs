//! Report formatting.
//!
//! A formatter receives the surviving matches, the suppressed matches, and
//! the display options, and returns a string. Output is stable across runs
//! given identical inputs: matches are sorted by `(file, line, type,
//! offset)` before rendering, and the structured formats serialize through
//! ordered maps.

use crate::error::{FerretError, Result};
use crate::types::{Match, SuppressedMatch};
use std::collections::HashSet;

pub mod csv;
pub mod json;
pub mod text;
pub mod yaml;

pub use csv::CsvFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;
pub use yaml::YamlFormatter;

/// Confidence bands used by the `--confidence` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn of(confidence: f64) -> Option<Self> {
        if confidence >= 80.0 {
            Some(ConfidenceLevel::High)
        } else if confidence >= 50.0 {
            Some(ConfidenceLevel::Medium)
        } else if confidence >= 20.0 {
            Some(ConfidenceLevel::Low)
        } else {
            None
        }
    }
}

/// Which confidence bands the report shows. `All` keeps every emitted match.
#[derive(Debug, Clone, Default)]
pub enum ConfidenceFilter {
    #[default]
    All,
    Levels(HashSet<ConfidenceLevel>),
}

impl ConfidenceFilter {
    /// Parse `high`, `medium`, `low`, `all`, or a comma list.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut levels = HashSet::new();
        for part in raw.split(',').map(|p| p.trim().to_lowercase()) {
            match part.as_str() {
                "all" => return Ok(ConfidenceFilter::All),
                "high" => {
                    levels.insert(ConfidenceLevel::High);
                }
                "medium" => {
                    levels.insert(ConfidenceLevel::Medium);
                }
                "low" => {
                    levels.insert(ConfidenceLevel::Low);
                }
                "" => {}
                other => {
                    return Err(FerretError::configuration(format!(
                        "unknown confidence level '{}'",
                        other
                    )));
                }
            }
        }
        if levels.is_empty() {
            return Ok(ConfidenceFilter::All);
        }
        Ok(ConfidenceFilter::Levels(levels))
    }

    pub fn accepts(&self, confidence: f64) -> bool {
        match self {
            ConfidenceFilter::All => confidence > 0.0,
            ConfidenceFilter::Levels(levels) => {
                ConfidenceLevel::of(confidence).is_some_and(|level| levels.contains(&level))
            }
        }
    }
}

/// Options handed to every formatter.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub confidence_filter: ConfidenceFilter,
    pub verbose: bool,
    pub no_color: bool,
    pub show_match: bool,
    pub show_suppressed: bool,
    pub pre_commit_mode: bool,
}

/// Formatter contract: stable output for identical inputs.
pub trait ReportFormatter: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self, matches: &[Match], suppressed: &[SuppressedMatch], options: &ReportOptions) -> String;
}

/// Sort matches by `(file, line, type, offset)`.
pub fn sort_matches(matches: &mut [Match]) {
    matches.sort_by(|a, b| {
        (&a.file, a.line_number.unwrap_or(0), &a.match_type, a.offset).cmp(&(
            &b.file,
            b.line_number.unwrap_or(0),
            &b.match_type,
            b.offset,
        ))
    });
}

/// Apply the confidence filter and sort; every formatter starts here.
pub(crate) fn prepare(matches: &[Match], options: &ReportOptions) -> Vec<Match> {
    let mut kept: Vec<Match> = matches
        .iter()
        .filter(|m| options.confidence_filter.accepts(m.confidence))
        .cloned()
        .collect();
    sort_matches(&mut kept);
    kept
}

/// The match text as a formatter may print it.
pub(crate) fn display_text(m: &Match, options: &ReportOptions) -> String {
    if options.show_match {
        m.text.clone()
    } else {
        "[hidden]".to_string()
    }
}

/// Resolve a `--format` value. The CI-oriented names share the JSON
/// serializer's structure.
pub fn formatter_for(name: &str) -> Result<Box<dyn ReportFormatter>> {
    match name.to_lowercase().as_str() {
        "text" => Ok(Box::new(TextFormatter)),
        "json" | "junit" | "gitlab-sast" | "sarif" => Ok(Box::new(JsonFormatter)),
        "csv" => Ok(Box::new(CsvFormatter)),
        "yaml" => Ok(Box::new(YamlFormatter)),
        other => Err(FerretError::configuration(format!("unknown report format '{}'", other))),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::{Match, MatchContext};
    use std::collections::HashMap;

    pub fn fake_match(file: &str, line: u32, match_type: &str, text: &str, confidence: f64) -> Match {
        Match {
            match_type: match_type.to_string(),
            text: text.to_string(),
            line_number: Some(line),
            offset: 0,
            confidence,
            validator: match_type.to_lowercase(),
            file: file.into(),
            context: MatchContext::default(),
            metadata: HashMap::new(),
        }
    }
}
