//! Context capture and keyword-driven context impact.
//!
//! Every text match records the line it occurred on plus small before/after
//! windows. The validator's curated keyword sets are searched in both: a
//! positive keyword on the same line is worth more than one in the broader
//! window, negative keywords subtract proportionally, and the combined delta
//! is clamped to `[-50, +25]`.

use crate::types::MatchContext;

/// Weight of a positive keyword found on the match line.
pub const SAME_LINE_WEIGHT: f64 = 7.0;
/// Weight of a positive keyword found in the before/after window.
pub const WINDOW_WEIGHT: f64 = 3.0;
/// Lines captured on each side of the match line.
pub const WINDOW_LINES: usize = 2;

pub const MIN_DELTA: f64 = -50.0;
pub const MAX_DELTA: f64 = 25.0;

/// Capture the surrounding context of a match on `lines[line_idx]` and score
/// it against the validator's keyword sets.
pub fn capture(lines: &[&str], line_idx: usize, positive: &[&str], negative: &[&str]) -> MatchContext {
    let full_line = lines.get(line_idx).copied().unwrap_or_default().to_string();
    let before_start = line_idx.saturating_sub(WINDOW_LINES);
    let before = lines[before_start..line_idx].join("\n");
    let after_end = (line_idx + 1 + WINDOW_LINES).min(lines.len());
    let after = lines[(line_idx + 1).min(lines.len())..after_end].join("\n");

    let line_lower = full_line.to_lowercase();
    let window_lower = format!("{}\n{}", before.to_lowercase(), after.to_lowercase());

    let mut delta = 0.0;
    let mut positive_found = Vec::new();
    for keyword in positive {
        if line_lower.contains(keyword) {
            delta += SAME_LINE_WEIGHT;
            positive_found.push(keyword.to_string());
        } else if window_lower.contains(keyword) {
            delta += WINDOW_WEIGHT;
            positive_found.push(keyword.to_string());
        }
    }

    let mut negative_found = Vec::new();
    for keyword in negative {
        if line_lower.contains(keyword) {
            delta -= SAME_LINE_WEIGHT;
            negative_found.push(keyword.to_string());
        } else if window_lower.contains(keyword) {
            delta -= WINDOW_WEIGHT;
            negative_found.push(keyword.to_string());
        }
    }

    MatchContext {
        full_line,
        before,
        after,
        positive_keywords: positive_found,
        negative_keywords: negative_found,
        context_delta: delta.clamp(MIN_DELTA, MAX_DELTA),
    }
}
