//! CSV report.

use crate::report::{ReportFormatter, ReportOptions, display_text, prepare};
use crate::types::{Match, SuppressedMatch};

pub struct CsvFormatter;

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl ReportFormatter for CsvFormatter {
    fn name(&self) -> &str {
        "csv"
    }

    fn format(&self, matches: &[Match], suppressed: &[SuppressedMatch], options: &ReportOptions) -> String {
        let kept = prepare(matches, options);
        let mut out = String::from("file,line,type,confidence,validator,text,suppressed,rule_id\n");
        for m in &kept {
            out.push_str(&format!(
                "{},{},{},{:.1},{},{},false,\n",
                escape(&m.file.display().to_string()),
                m.line_number.map(|l| l.to_string()).unwrap_or_default(),
                escape(&m.match_type),
                m.confidence,
                escape(&m.validator),
                escape(&display_text(m, options)),
            ));
        }
        if options.show_suppressed {
            let mut ordered: Vec<&SuppressedMatch> = suppressed.iter().collect();
            ordered.sort_by(|a, b| (&a.matched.file, &a.rule_id).cmp(&(&b.matched.file, &b.rule_id)));
            for s in ordered {
                out.push_str(&format!(
                    "{},{},{},{:.1},{},{},true,{}\n",
                    escape(&s.matched.file.display().to_string()),
                    s.matched.line_number.map(|l| l.to_string()).unwrap_or_default(),
                    escape(&s.matched.match_type),
                    s.matched.confidence,
                    escape(&s.matched.validator),
                    escape(&display_text(&s.matched, options)),
                    escape(&s.rule_id),
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::fake_match;

    #[test]
    fn header_and_rows() {
        let matches = vec![fake_match("/tmp/a.txt", 4, "PHONE", "423-733-9140", 77.0)];
        let out = CsvFormatter.format(&matches, &[], &ReportOptions::default());
        let mut lines = out.lines();
        assert_eq!(lines.next().unwrap(), "file,line,type,confidence,validator,text,suppressed,rule_id");
        assert_eq!(lines.next().unwrap(), "/tmp/a.txt,4,PHONE,77.0,phone,[hidden],false,");
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let mut m = fake_match("/tmp/a, b.txt", 1, "EMAIL", "x@y.io", 90.0);
        m.validator = "em,ail".to_string();
        let out = CsvFormatter.format(&[m], &[], &ReportOptions::default());
        assert!(out.contains("\"/tmp/a, b.txt\""));
        assert!(out.contains("\"em,ail\""));
    }
}
