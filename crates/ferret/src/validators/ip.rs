//! IP address validator.

use crate::types::Match;
use crate::validators::{ConfidenceChecks, Validator, scan_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static V4_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("static pattern"));
static V6_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[0-9a-fA-F]{1,4}:){4,7}[0-9a-fA-F]{1,4}\b").expect("static pattern"));

const POSITIVE: &[&str] = &["ip", "host", "server", "gateway", "address", "endpoint", "firewall", "vpn"];
const NEGATIVE: &[&str] = &["version", "release", "v1.", "v2.", "chapter", "section"];

pub struct IpValidator;

impl IpValidator {
    pub fn new() -> Self {
        Self
    }

    fn octets(value: &str) -> Option<[u8; 4]> {
        let mut out = [0u8; 4];
        let mut parts = value.split('.');
        for slot in &mut out {
            *slot = parts.next()?.parse().ok()?;
        }
        parts.next().is_none().then_some(out)
    }
}

impl Default for IpValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for IpValidator {
    fn name(&self) -> &str {
        "ip"
    }

    fn tag(&self) -> &str {
        "IP_ADDRESS"
    }

    fn validate_content(&self, text: &str, source: &Path) -> Vec<Match> {
        let mut matches = scan_text(self, &V4_PATTERN, text, source);
        matches.extend(scan_text(self, &V6_PATTERN, text, source));
        matches
    }

    fn calculate_confidence(&self, match_text: &str) -> ConfidenceChecks {
        let mut checks = HashMap::new();
        let mut confidence = 100.0;

        if match_text.contains(':') {
            // IPv6: the pattern itself constrains the groups.
            let not_loopback = match_text != "::1";
            if !not_loopback {
                confidence -= 40.0;
            }
            checks.insert("valid_octets".to_string(), true);
            checks.insert("not_private".to_string(), not_loopback);
            checks.insert("not_documentation".to_string(), true);
            return (confidence, checks);
        }

        let octets = Self::octets(match_text);
        let valid = octets.is_some();
        let (not_private, not_documentation) = match octets {
            Some([a, b, ..]) => {
                let private = a == 10 || a == 127 || (a == 192 && b == 168) || (a == 172 && (16..=31).contains(&b));
                let documentation = matches!(
                    (a, b),
                    (192, 0) | (198, 51) | (203, 0) | (0, _) | (255, 255)
                );
                (!private, !documentation)
            }
            None => (true, true),
        };

        if !valid {
            confidence -= 50.0;
        }
        if !not_private {
            confidence -= 25.0;
        }
        if !not_documentation {
            confidence -= 25.0;
        }

        checks.insert("valid_octets".to_string(), valid);
        checks.insert("not_private".to_string(), not_private);
        checks.insert("not_documentation".to_string(), not_documentation);
        (confidence, checks)
    }

    fn positive_keywords(&self) -> &[&str] {
        POSITIVE
    }

    fn negative_keywords(&self) -> &[&str] {
        NEGATIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_v4_scores_full() {
        let v = IpValidator::new();
        let (conf, checks) = v.calculate_confidence("52.94.133.10");
        assert_eq!(conf, 100.0);
        assert!(checks["valid_octets"]);
    }

    #[test]
    fn out_of_range_octet_fails() {
        let v = IpValidator::new();
        let (_, checks) = v.calculate_confidence("300.1.2.3");
        assert_eq!(checks["valid_octets"], false);
    }

    #[test]
    fn private_ranges_are_penalized() {
        let v = IpValidator::new();
        for private in ["10.0.0.1", "192.168.1.5", "172.20.0.9", "127.0.0.1"] {
            let (_, checks) = v.calculate_confidence(private);
            assert_eq!(checks["not_private"], false, "{} should be private", private);
        }
    }

    #[test]
    fn documentation_ranges_are_penalized() {
        let v = IpValidator::new();
        let (_, checks) = v.calculate_confidence("192.0.2.7");
        assert_eq!(checks["not_documentation"], false);
    }

    #[test]
    fn v6_is_matched() {
        let v = IpValidator::new();
        let matches = v.validate_content("host 2001:0db8:85a3:0000:0000:8a2e:0370:7334\n", Path::new("a.txt"));
        assert_eq!(matches.len(), 1);
    }
}
