//! Redaction strategies.
//!
//! Three ways to produce a replacement for a matched value: a fixed tag, a
//! character-class-preserving random substitution, and category-specific
//! synthetic generation remapped onto the original's positional template.
//!
//! Generated replacements must not reproduce any 3-byte substring of the
//! original that is not purely structural. [`replacement`] checks every
//! candidate against that rule and regenerates a bounded number of times
//! before falling back to the fixed tag.

use crate::types::RedactionStrategyKind;
use crate::validators::credit_card::luhn_valid;
use rand::Rng;

/// Regeneration attempts before the fixed tag wins.
const MAX_GENERATION_ATTEMPTS: usize = 16;

/// Fixed-tag replacement, e.g. `[EMAIL-REDACTED]`.
pub fn simple_tag(data_type: &str) -> String {
    format!("[{}-REDACTED]", data_type)
}

/// Whether `candidate` reproduces a 3-byte substring of `original` that
/// contains at least one alphanumeric byte. Purely structural windows
/// (whitespace, punctuation) are allowed to survive.
fn leaks_original(original: &str, candidate: &str) -> bool {
    original.as_bytes().windows(3).any(|window| {
        window.iter().any(|b| b.is_ascii_alphanumeric())
            && candidate.as_bytes().windows(3).any(|c| c == window)
    })
}

/// Character-class-preserving substitution: each digit becomes a random
/// digit, each ASCII letter a random letter of the same case; punctuation,
/// whitespace, and non-ASCII characters are retained. Byte length is
/// preserved.
pub fn format_preserving<R: Rng>(original: &str, rng: &mut R) -> String {
    original
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                char::from(b'0' + rng.random_range(0u8..10))
            } else if c.is_ascii_uppercase() {
                char::from(b'A' + rng.random_range(0u8..26))
            } else if c.is_ascii_lowercase() {
                char::from(b'a' + rng.random_range(0u8..26))
            } else {
                c
            }
        })
        .collect()
}

/// Remap a generated value onto the positional template of the original:
/// generated characters land where the original had alphanumerics, the
/// original's punctuation and spacing survive.
pub fn preserve_format<R: Rng>(template: &str, generated: &str, rng: &mut R) -> String {
    let mut source = generated.chars().filter(|c| c.is_ascii_alphanumeric());
    template
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                source.next().unwrap_or_else(|| fill_char(c, rng))
            } else {
                c
            }
        })
        .collect()
}

fn fill_char<R: Rng>(class_of: char, rng: &mut R) -> char {
    if class_of.is_ascii_digit() {
        char::from(b'0' + rng.random_range(0u8..10))
    } else if class_of.is_ascii_uppercase() {
        char::from(b'A' + rng.random_range(0u8..26))
    } else {
        char::from(b'a' + rng.random_range(0u8..26))
    }
}

/// Category-specific synthetic generation.
pub fn synthetic<R: Rng>(data_type: &str, original: &str, rng: &mut R) -> String {
    let generated = match data_type {
        "CREDIT_CARD" => synthetic_card(original, rng),
        "SSN" => synthetic_ssn(rng),
        "EMAIL" => return synthetic_email(rng),
        "PHONE" => synthetic_phone(rng),
        _ => return format_preserving(original, rng),
    };
    preserve_format(original, &generated, rng)
}

/// A Luhn-valid number with the original's issuer network digit and digit
/// count. Only the single leading digit is kept; a longer issuer prefix
/// would reproduce 3-digit runs of the original in the output.
fn synthetic_card<R: Rng>(original: &str, rng: &mut R) -> String {
    let digits: Vec<u32> = original.chars().filter_map(|c| c.to_digit(10)).collect();
    let len = digits.len().clamp(13, 19);

    let mut out: Vec<u32> = digits.iter().take(1).copied().collect();
    while out.len() < len - 1 {
        out.push(rng.random_range(0..10));
    }
    // Check digit via Luhn.
    let partial: String = out.iter().map(|d| char::from(b'0' + *d as u8)).collect();
    for candidate in 0..10u32 {
        let full = format!("{}{}", partial, candidate);
        if luhn_valid(&full) {
            return full;
        }
    }
    partial
}

/// Structurally valid SSN: area not 0, 666, or 900+; group and serial
/// non-zero.
fn synthetic_ssn<R: Rng>(rng: &mut R) -> String {
    let area = loop {
        let candidate = rng.random_range(1u32..900);
        if candidate != 666 {
            break candidate;
        }
    };
    let group = rng.random_range(1u32..100);
    let serial = rng.random_range(1u32..10_000);
    format!("{:03}{:02}{:04}", area, group, serial)
}

/// Well-formed address on a reserved domain. The original's domain is not
/// carried over, so no part of the matched text survives.
fn synthetic_email<R: Rng>(rng: &mut R) -> String {
    let local: String = (0..8).map(|_| char::from(b'a' + rng.random_range(0u8..26))).collect();
    format!("{}@redacted.invalid", local)
}

/// Area codes safe to hand out: valid NANP, none of the reserved toll-free
/// or fictional codes.
const SYNTHETIC_AREA_CODES: &[u32] = &[212, 310, 404, 415, 469, 512, 617, 702, 808, 919];

fn synthetic_phone<R: Rng>(rng: &mut R) -> String {
    let area = SYNTHETIC_AREA_CODES[rng.random_range(0..SYNTHETIC_AREA_CODES.len())];
    let exchange = rng.random_range(200u32..1000);
    let line = rng.random_range(0u32..10_000);
    format!("{:03}{:03}{:04}", area, exchange, line)
}

/// Produce the replacement for one match under the given strategy.
///
/// Generated candidates are rejected while they reproduce non-structural
/// 3-byte substrings of the original; after [`MAX_GENERATION_ATTEMPTS`] the
/// fixed tag is used instead.
pub fn replacement<R: Rng>(strategy: RedactionStrategyKind, data_type: &str, original: &str, rng: &mut R) -> String {
    if strategy == RedactionStrategyKind::Simple {
        return simple_tag(data_type);
    }
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let candidate = match strategy {
            RedactionStrategyKind::FormatPreserving => format_preserving(original, rng),
            _ => synthetic(data_type, original, rng),
        };
        if !leaks_original(original, &candidate) {
            return candidate;
        }
    }
    simple_tag(data_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_class(c: char) -> u8 {
        if c.is_ascii_digit() {
            0
        } else if c.is_ascii_uppercase() {
            1
        } else if c.is_ascii_lowercase() {
            2
        } else {
            3
        }
    }

    #[test]
    fn format_preserving_keeps_length_and_classes() {
        let mut rng = rand::rng();
        let original = "Card 4111-1111 1111.1111 Xy";
        let redacted = format_preserving(original, &mut rng);
        assert_eq!(redacted.len(), original.len());
        for (a, b) in original.chars().zip(redacted.chars()) {
            assert_eq!(char_class(a), char_class(b));
        }
    }

    #[test]
    fn leak_detection_matches_non_structural_trigrams() {
        assert!(leaks_original("4111 1111 1111 1111", "xx411yy"));
        assert!(leaks_original("maria@acme-corp.io", "other@acme-corp.io"));
        assert!(!leaks_original("4111 1111 1111 1111", "[CREDIT_CARD-REDACTED]"));
        // Shared punctuation-only windows are structural, not leaks.
        assert!(!leaks_original("a---b", "c---d"));
    }

    #[test]
    fn synthetic_card_keeps_network_digit_and_luhn() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let out = synthetic("CREDIT_CARD", "4111 1111 1111 1111", &mut rng);
            let digits: String = out.chars().filter(|c| c.is_ascii_digit()).collect();
            assert_eq!(digits.len(), 16);
            assert!(luhn_valid(&digits), "not Luhn valid: {}", digits);
            assert!(digits.starts_with('4'));
            // Grouping of the original is preserved.
            assert_eq!(out.chars().filter(|c| *c == ' ').count(), 3);
        }
    }

    #[test]
    fn synthetic_replacements_never_leak_original_trigrams() {
        let mut rng = rand::rng();
        let cases = [
            ("CREDIT_CARD", "4111 1111 1111 1111"),
            ("SSN", "123-45-6789"),
            ("EMAIL", "maria.lopez@acme-corp.io"),
            ("PHONE", "423-733-9140"),
        ];
        for (data_type, original) in cases {
            for _ in 0..50 {
                let out = replacement(RedactionStrategyKind::Synthetic, data_type, original, &mut rng);
                assert!(!leaks_original(original, &out), "{} leaked into {}", original, out);
            }
        }
    }

    #[test]
    fn format_preserving_replacement_never_leaks() {
        let mut rng = rand::rng();
        let original = "123-45-6789";
        for _ in 0..50 {
            let out = replacement(RedactionStrategyKind::FormatPreserving, "SSN", original, &mut rng);
            assert!(!leaks_original(original, &out), "leaked into {}", out);
        }
    }

    #[test]
    fn synthetic_ssn_avoids_forbidden_areas() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let out = synthetic("SSN", "123-45-6789", &mut rng);
            let digits: String = out.chars().filter(|c| c.is_ascii_digit()).collect();
            let area: u32 = digits[0..3].parse().unwrap();
            assert!(area != 0 && area != 666 && area < 900, "bad area in {}", digits);
            assert_ne!(&digits[3..5], "00");
            assert_ne!(&digits[5..9], "0000");
            assert_eq!(out.matches('-').count(), 2);
        }
    }

    #[test]
    fn synthetic_email_uses_reserved_domain() {
        let mut rng = rand::rng();
        let out = synthetic("EMAIL", "maria.lopez@acme-corp.io", &mut rng);
        assert!(out.ends_with("@redacted.invalid"), "got {}", out);
        assert!(!out.contains("acme-corp.io"));
    }

    #[test]
    fn synthetic_phone_avoids_reserved_area_codes() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let out = synthetic("PHONE", "423-733-9140", &mut rng);
            let digits: String = out.chars().filter(|c| c.is_ascii_digit()).collect();
            let area = &digits[0..3];
            assert!(!["555", "800", "888", "877", "866"].contains(&area));
        }
    }

    #[test]
    fn simple_tag_names_the_category() {
        assert_eq!(simple_tag("SSN"), "[SSN-REDACTED]");
        assert_eq!(simple_tag("EMAIL"), "[EMAIL-REDACTED]");
    }
}
