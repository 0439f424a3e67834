//! Unified diffs between a file and its printed form

use similar::TextDiff;

/// Unchanged lines shown around each hunk
pub const CONTEXT_LINES: usize = 3;

/// Unified diff from `original` to `rewritten`
///
/// Empty exactly when the two texts are equal. A missing final newline on
/// either side is called out, so texts differing only there still diff.
pub fn unified_diff(original: &str, rewritten: &str, from_label: &str, to_label: &str) -> String {
    if original == rewritten {
        return String::new();
    }
    TextDiff::from_lines(original, rewritten)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .missing_newline_hint(true)
        .header(from_label, to_label)
        .to_string()
}
