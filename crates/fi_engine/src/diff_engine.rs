//! Line diffs between the original and the cleaned wikitext, for review
//! output.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};

/// Number of changed lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

impl DiffStats {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

pub fn diff_stats(old: &str, new: &str) -> DiffStats {
    let diff = TextDiff::from_lines(old, new);
    diff.iter_all_changes()
        .fold(DiffStats::default(), |mut stats, change| {
            match change.tag() {
                ChangeTag::Insert => stats.added += 1,
                ChangeTag::Delete => stats.removed += 1,
                ChangeTag::Equal => {}
            }
            stats
        })
}

/// Unified diff with `--- original` / `+++ cleaned` headers. Empty when both
/// texts are equal.
pub fn unified_diff(old: &str, new: &str, context_lines: usize) -> String {
    if old == new {
        return String::new();
    }
    let diff = TextDiff::from_lines(old, new);
    let mut output = diff
        .unified_diff()
        .context_radius(context_lines)
        .header("original", "cleaned")
        .to_string();
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}
