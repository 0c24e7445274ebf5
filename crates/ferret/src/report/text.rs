//! Human-readable text report.

use crate::report::{ReportFormatter, ReportOptions, display_text, prepare};
use crate::types::{Match, SuppressedMatch};
use std::fmt::Write;

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

pub struct TextFormatter;

fn severity_color(confidence: f64, no_color: bool) -> (&'static str, &'static str) {
    if no_color {
        ("", "")
    } else if confidence >= 80.0 {
        (RED, RESET)
    } else {
        (YELLOW, RESET)
    }
}

impl ReportFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn format(&self, matches: &[Match], suppressed: &[SuppressedMatch], options: &ReportOptions) -> String {
        let kept = prepare(matches, options);
        let mut out = String::new();

        if kept.is_empty() {
            out.push_str("No findings.\n");
        }
        for m in &kept {
            let (color, reset) = severity_color(m.confidence, options.no_color);
            let location = match m.line_number {
                Some(line) => format!("{}:{}", m.file.display(), line),
                None => format!("{} (metadata)", m.file.display()),
            };
            let _ = writeln!(
                out,
                "{color}{location}: {} (confidence {:.1}){reset} {}",
                m.match_type,
                m.confidence,
                display_text(m, options),
            );
            if options.verbose {
                let _ = writeln!(out, "    validator: {}", m.validator);
                if !m.context.positive_keywords.is_empty() {
                    let _ = writeln!(out, "    context: +{}", m.context.positive_keywords.join(", +"));
                }
                if !m.context.negative_keywords.is_empty() {
                    let _ = writeln!(out, "    context: -{}", m.context.negative_keywords.join(", -"));
                }
            }
        }

        if options.show_suppressed && !suppressed.is_empty() {
            let dim = if options.no_color { "" } else { DIM };
            let reset = if options.no_color { "" } else { RESET };
            let _ = writeln!(out, "\nSuppressed ({}):", suppressed.len());
            let mut ordered: Vec<&SuppressedMatch> = suppressed.iter().collect();
            ordered.sort_by(|a, b| (&a.matched.file, &a.rule_id).cmp(&(&b.matched.file, &b.rule_id)));
            for s in ordered {
                let expired = if s.expired { " [rule EXPIRED]" } else { "" };
                let _ = writeln!(
                    out,
                    "{dim}{}: {} by rule '{}'{}{reset}",
                    s.matched.file.display(),
                    s.matched.match_type,
                    s.rule_id,
                    expired,
                );
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::fake_match;

    fn options() -> ReportOptions {
        ReportOptions {
            no_color: true,
            ..ReportOptions::default()
        }
    }

    #[test]
    fn match_text_hidden_by_default() {
        let matches = vec![fake_match("/tmp/a.txt", 1, "SSN", "123-45-6789", 92.0)];
        let out = TextFormatter.format(&matches, &[], &options());
        assert!(out.contains("/tmp/a.txt:1: SSN (confidence 92.0)"));
        assert!(!out.contains("123-45-6789"));
        assert!(out.contains("[hidden]"));
    }

    #[test]
    fn show_match_prints_the_literal() {
        let matches = vec![fake_match("/tmp/a.txt", 1, "SSN", "123-45-6789", 92.0)];
        let mut options = options();
        options.show_match = true;
        let out = TextFormatter.format(&matches, &[], &options);
        assert!(out.contains("123-45-6789"));
    }

    #[test]
    fn suppressed_only_shown_on_request() {
        let matched = fake_match("/tmp/a.txt", 1, "SSN", "123-45-6789", 92.0);
        let suppressed = vec![SuppressedMatch {
            matched,
            rule_id: "r1".to_string(),
            rule_reason: None,
            expires_at: None,
            expired: true,
        }];

        let hidden = TextFormatter.format(&[], &suppressed, &options());
        assert!(!hidden.contains("r1"));

        let mut options = options();
        options.show_suppressed = true;
        let shown = TextFormatter.format(&[], &suppressed, &options);
        assert!(shown.contains("by rule 'r1'"));
        assert!(shown.contains("EXPIRED"));
    }

    #[test]
    fn output_is_stable() {
        let matches = vec![
            fake_match("/tmp/b.txt", 2, "EMAIL", "a@b.io", 85.0),
            fake_match("/tmp/a.txt", 1, "SSN", "123-45-6789", 92.0),
        ];
        let first = TextFormatter.format(&matches, &[], &options());
        let second = TextFormatter.format(&matches, &[], &options());
        assert_eq!(first, second);
        // Sorted by file regardless of input order.
        assert!(first.find("/tmp/a.txt").unwrap() < first.find("/tmp/b.txt").unwrap());
    }
}
