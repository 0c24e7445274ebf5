//! JSON report.
//!
//! serde_json's map type keeps keys ordered, so identical inputs serialize
//! identically.

use crate::report::{ReportFormatter, ReportOptions, display_text, prepare};
use crate::types::{Match, SuppressedMatch};
use serde_json::{Value, json};

pub struct JsonFormatter;

fn match_record(m: &Match, options: &ReportOptions) -> Value {
    let mut record = json!({
        "type": m.match_type,
        "file": m.file.display().to_string(),
        "line": m.line_number,
        "offset": m.offset,
        "confidence": (m.confidence * 10.0).round() / 10.0,
        "validator": m.validator,
        "text": display_text(m, options),
    });
    if options.verbose {
        record["context"] = json!({
            "positive_keywords": m.context.positive_keywords,
            "negative_keywords": m.context.negative_keywords,
            "delta": m.context.context_delta,
        });
        record["metadata"] = serde_json::to_value(&m.metadata).unwrap_or(Value::Null);
    }
    record
}

impl ReportFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn format(&self, matches: &[Match], suppressed: &[SuppressedMatch], options: &ReportOptions) -> String {
        let kept = prepare(matches, options);
        let match_values: Vec<Value> = kept.iter().map(|m| match_record(m, options)).collect();

        let suppressed_values: Vec<Value> = if options.show_suppressed {
            let mut ordered: Vec<&SuppressedMatch> = suppressed.iter().collect();
            ordered.sort_by(|a, b| (&a.matched.file, &a.rule_id).cmp(&(&b.matched.file, &b.rule_id)));
            ordered
                .iter()
                .map(|s| {
                    json!({
                        "type": s.matched.match_type,
                        "file": s.matched.file.display().to_string(),
                        "rule_id": s.rule_id,
                        "reason": s.rule_reason,
                        "expired": s.expired,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        let document = json!({
            "findings": match_values,
            "suppressed": suppressed_values,
            "summary": {
                "total": kept.len(),
                "suppressed": suppressed.len(),
            },
        });
        serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::fake_match;

    #[test]
    fn document_shape_and_hidden_text() {
        let matches = vec![fake_match("/tmp/a.txt", 3, "EMAIL", "x@y.io", 88.0)];
        let out = JsonFormatter.format(&matches, &[], &ReportOptions::default());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["summary"]["total"], 1);
        assert_eq!(value["findings"][0]["type"], "EMAIL");
        assert_eq!(value["findings"][0]["line"], 3);
        assert_eq!(value["findings"][0]["text"], "[hidden]");
    }

    #[test]
    fn stable_across_runs() {
        let matches = vec![
            fake_match("/tmp/b.txt", 1, "SSN", "123-45-6789", 95.0),
            fake_match("/tmp/a.txt", 9, "EMAIL", "x@y.io", 70.0),
        ];
        let first = JsonFormatter.format(&matches, &[], &ReportOptions::default());
        let second = JsonFormatter.format(&matches, &[], &ReportOptions::default());
        assert_eq!(first, second);
    }

    #[test]
    fn confidence_filter_applies() {
        let matches = vec![
            fake_match("/tmp/a.txt", 1, "SSN", "x", 95.0),
            fake_match("/tmp/a.txt", 2, "PHONE", "y", 45.0),
        ];
        let mut options = ReportOptions::default();
        options.confidence_filter = crate::report::ConfidenceFilter::parse("high").unwrap();
        let out = JsonFormatter.format(&matches, &[], &options);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["findings"].as_array().unwrap().len(), 1);
    }
}
