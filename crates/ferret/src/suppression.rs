//! Suppression rules.
//!
//! A YAML file holds a top-level list of rules; each rule may constrain the
//! match type, a regex over the matched text, and a glob over the file path.
//! Expired rules still suppress, but the suppressed record is flagged so
//! formatters can warn. Rule generation emits disabled proposals for
//! operator review.

use crate::error::{FerretError, Result};
use crate::types::{Match, SuppressedMatch};
use chrono::{DateTime, Utc};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub match_type: Option<String>,
    /// Regex over the matched text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Glob over the file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

struct CompiledRule {
    rule: SuppressionRule,
    pattern: Option<Regex>,
    glob: Option<GlobMatcher>,
}

impl CompiledRule {
    fn compile(rule: SuppressionRule) -> Result<Self> {
        let pattern = match &rule.pattern {
            Some(raw) => Some(Regex::new(raw).map_err(|err| {
                FerretError::configuration(format!("rule '{}' has an invalid pattern: {}", rule.id, err))
            })?),
            None => None,
        };
        let glob = match &rule.file {
            Some(raw) => Some(
                Glob::new(raw)
                    .map_err(|err| {
                        FerretError::configuration(format!("rule '{}' has an invalid file glob: {}", rule.id, err))
                    })?
                    .compile_matcher(),
            ),
            None => None,
        };
        Ok(Self { rule, pattern, glob })
    }

    fn expired(&self, now: DateTime<Utc>) -> bool {
        self.rule.expires_at.is_some_and(|at| at < now)
    }

    fn matches(&self, m: &Match) -> bool {
        if !self.rule.enabled {
            return false;
        }
        if let Some(wanted) = &self.rule.match_type
            && !wanted.eq_ignore_ascii_case(&m.match_type)
        {
            return false;
        }
        if let Some(pattern) = &self.pattern
            && !pattern.is_match(&m.text)
        {
            return false;
        }
        if let Some(glob) = &self.glob
            && !glob.is_match(&m.file)
        {
            return false;
        }
        // A rule with no criteria matches nothing rather than everything.
        self.rule.match_type.is_some() || self.pattern.is_some() || self.glob.is_some()
    }
}

pub struct SuppressionFilter {
    rules: Vec<CompiledRule>,
}

impl SuppressionFilter {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn from_rules(rules: Vec<SuppressionRule>) -> Result<Self> {
        let rules = rules.into_iter().map(CompiledRule::compile).collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Load the YAML rule file: a top-level list of rules.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| FerretError::from(err).with_path(path))?;
        let rules: Vec<SuppressionRule> = serde_yaml_ng::from_str(&raw)
            .map_err(|err| FerretError::configuration(format!("invalid suppression file: {}", err)).with_path(path))?;
        Self::from_rules(rules)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decide whether a configured rule hides this match.
    pub fn evaluate(&self, m: &Match) -> Option<(&SuppressionRule, bool)> {
        let now = Utc::now();
        self.rules
            .iter()
            .find(|rule| rule.matches(m))
            .map(|rule| (&rule.rule, rule.expired(now)))
    }

    /// Partition matches into surviving and suppressed.
    pub fn filter(&self, matches: Vec<Match>) -> (Vec<Match>, Vec<SuppressedMatch>) {
        let mut kept = Vec::with_capacity(matches.len());
        let mut suppressed = Vec::new();
        for m in matches {
            match self.evaluate(&m) {
                Some((rule, expired)) => suppressed.push(SuppressedMatch {
                    rule_id: rule.id.clone(),
                    rule_reason: rule.reason.clone(),
                    expires_at: rule.expires_at,
                    expired,
                    matched: m,
                }),
                None => kept.push(m),
            }
        }
        (kept, suppressed)
    }
}

/// Mask a literal value into a shape-preserving regex: digits become `\d`,
/// letters `\w`, everything else is escaped. Keeps the sensitive value out of
/// the generated rule file.
fn mask_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if c.is_ascii_digit() {
            out.push_str(r"\d");
        } else if c.is_alphabetic() {
            out.push_str(r"\w");
        } else {
            out.push_str(&regex::escape(&c.to_string()));
        }
    }
    out
}

/// Propose one disabled rule per `(type, file)` group so operators can
/// review before activating.
pub fn generate_proposals(matches: &[Match]) -> Vec<SuppressionRule> {
    let mut groups: HashMap<(String, String), &Match> = HashMap::new();
    for m in matches {
        groups.entry((m.match_type.clone(), m.file.display().to_string())).or_insert(m);
    }

    let mut keys: Vec<_> = groups.keys().cloned().collect();
    keys.sort();
    keys.iter()
        .enumerate()
        .map(|(index, key)| {
            let representative = groups[key];
            SuppressionRule {
                id: format!("auto-{}-{}", key.0.to_lowercase().replace('_', "-"), index + 1),
                match_type: Some(key.0.clone()),
                pattern: Some(mask_pattern(&representative.text)),
                file: Some(key.1.clone()),
                reason: Some("auto-generated; review before enabling".to_string()),
                enabled: false,
                expires_at: None,
            }
        })
        .collect()
}

/// Serialize proposals as the suppression YAML document.
pub fn proposals_to_yaml(proposals: &[SuppressionRule]) -> Result<String> {
    serde_yaml_ng::to_string(proposals)
        .map_err(|err| FerretError::configuration(format!("failed to serialize proposals: {}", err)))
}
