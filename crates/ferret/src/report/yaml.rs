//! YAML report: the JSON document shape rendered as YAML.

use crate::report::{JsonFormatter, ReportFormatter, ReportOptions};
use crate::types::{Match, SuppressedMatch};

pub struct YamlFormatter;

impl ReportFormatter for YamlFormatter {
    fn name(&self) -> &str {
        "yaml"
    }

    fn format(&self, matches: &[Match], suppressed: &[SuppressedMatch], options: &ReportOptions) -> String {
        let json = JsonFormatter.format(matches, suppressed, options);
        let value: serde_json::Value = match serde_json::from_str(&json) {
            Ok(value) => value,
            Err(_) => return String::new(),
        };
        serde_yaml_ng::to_string(&value).unwrap_or_default()
    }
}
