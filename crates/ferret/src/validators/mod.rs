//! Data-category validators.
//!
//! Each validator owns one category (credit card, SSN, email, ...) and
//! exposes the same four operations: a regex scan producing candidate
//! matches, a category-specific confidence calculation, a context-impact
//! function over its curated keyword sets, and the combination of the three.
//! Base confidence starts at 100 and is reduced by the weighted failures of
//! each check; the final confidence is `clamp(base + context_delta, 0, 100)`
//! and anything at or below zero is dropped.

use crate::types::{Match, MatchContext};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub mod context;

pub mod credit_card;
pub mod email;
pub mod intellectual_property;
pub mod ip;
pub mod metadata;
pub mod passport;
pub mod person_name;
pub mod phone;
pub mod secrets;
pub mod social_media;
pub mod ssn;

pub use credit_card::CreditCardValidator;
pub use email::EmailValidator;
pub use intellectual_property::IntellectualPropertyValidator;
pub use ip::IpValidator;
pub use metadata::MetadataValidator;
pub use passport::PassportValidator;
pub use person_name::PersonNameValidator;
pub use phone::PhoneValidator;
pub use secrets::SecretsValidator;
pub use social_media::SocialMediaValidator;
pub use ssn::SsnValidator;

/// Result of a category-specific confidence calculation: the base confidence
/// plus the named pass/fail checks that produced it.
pub type ConfidenceChecks = (f64, HashMap<String, bool>);

/// Uniform validator contract.
pub trait Validator: Send + Sync {
    /// Lowercase-hyphen producer name, e.g. `"credit-card"`.
    fn name(&self) -> &str;

    /// Match tag, e.g. `"CREDIT_CARD"`.
    fn tag(&self) -> &str;

    /// Regex scan of body text, producing scored candidate matches with line
    /// numbers.
    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match>;

    /// Category-specific checks for one candidate. Base confidence starts at
    /// 100 and each failed check subtracts its weight.
    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks;

    /// Curated keyword sets, lowercase.
    fn positive_keywords(&self) -> &[&str];
    fn negative_keywords(&self) -> &[&str];

    /// Context impact for one candidate; the default combines the keyword
    /// sets over the captured windows.
    fn analyze_context(&self, _match_text: &str, context_info: &MatchContext) -> f64 {
        context_info.context_delta
    }
}

/// Shared scan loop: apply `regex` to `text`, capture context per match,
/// combine base confidence and context delta, and drop non-positive results.
pub(crate) fn scan_text<V: Validator + ?Sized>(
    validator: &V,
    regex: &Regex,
    text: &str,
    source: &Path,
) -> Vec<Match> {
    let lines: Vec<&str> = text.lines().collect();
    // Byte offset of each line start, for mapping match positions to lines.
    let mut line_starts = Vec::with_capacity(lines.len());
    let mut acc = 0usize;
    for line in &lines {
        line_starts.push(acc);
        acc += line.len() + 1;
    }

    let mut matches = Vec::new();
    for found in regex.find_iter(text) {
        let line_idx = match line_starts.binary_search(&found.start()) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let match_text = found.as_str();

        let (base, checks) = validator.calculate_confidence(match_text);
        let mut ctx = context::capture(
            &lines,
            line_idx,
            validator.positive_keywords(),
            validator.negative_keywords(),
        );
        let delta = validator.analyze_context(match_text, &ctx);
        ctx.context_delta = delta;

        let confidence = (base + delta).clamp(0.0, 100.0);
        if confidence <= 0.0 {
            continue;
        }

        let mut m = Match {
            match_type: validator.tag().to_string(),
            text: match_text.to_string(),
            line_number: Some(line_idx as u32 + 1),
            offset: found.start() - line_starts.get(line_idx).copied().unwrap_or(0),
            confidence,
            validator: validator.name().to_string(),
            file: source.to_path_buf(),
            context: ctx,
            metadata: HashMap::new(),
        };
        for (check, passed) in checks {
            m.set_meta(format!("check_{}", check), passed);
        }
        matches.push(m);
    }
    matches
}

/// The registered non-metadata validators, in tag order.
pub fn default_validators() -> Vec<Arc<dyn Validator>> {
    vec![
        Arc::new(CreditCardValidator::new()),
        Arc::new(SsnValidator::new()),
        Arc::new(EmailValidator::new()),
        Arc::new(PhoneValidator::new()),
        Arc::new(IpValidator::new()),
        Arc::new(PassportValidator::new()),
        Arc::new(PersonNameValidator::new()),
        Arc::new(IntellectualPropertyValidator::new()),
        Arc::new(SocialMediaValidator::new()),
        Arc::new(SecretsValidator::new()),
    ]
}

/// Restrict a registry to the requested tags; `None` keeps everything.
pub fn filter_validators(validators: Vec<Arc<dyn Validator>>, checks: Option<&[String]>) -> Vec<Arc<dyn Validator>> {
    match checks {
        None => validators,
        Some(tags) => {
            let wanted: Vec<String> = tags.iter().map(|t| t.to_uppercase()).collect();
            validators
                .into_iter()
                .filter(|v| wanted.iter().any(|t| t == v.tag()))
                .collect()
        }
    }
}
