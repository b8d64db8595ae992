//! Offset-based text edits collected during a read-only scan and applied in
//! one pass.
//!
//! Every edit addresses byte offsets of the *original* text, so edits never
//! have to be re-based after one another is applied.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at..at, text)
    }

    pub fn remove(range: Range<usize>) -> Self {
        Self::replace(range, String::new())
    }
}

/// Apply `edits` to `text`.
///
/// Edits are ordered by `(start, end)`; ties keep the order in which they
/// were pushed, so two insertions at the same offset come out in push order
/// and an insertion goes before a replacement starting at the same offset.
/// An edit starting inside a region already replaced by an earlier edit is
/// dropped: removing a whole template discards the edits found inside it.
pub fn apply_edits(text: &str, mut edits: Vec<TextEdit>) -> String {
    if edits.is_empty() {
        return text.to_string();
    }
    edits.sort_by_key(|edit| (edit.range.start, edit.range.end));

    let added: usize = edits.iter().map(|e| e.replacement.len()).sum();
    let mut result = String::with_capacity(text.len() + added);
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            tracing::trace!(?edit.range, "dropping edit inside a replaced region");
            continue;
        }
        result.push_str(&text[cursor..edit.range.start]);
        result.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    result.push_str(&text[cursor..]);
    result
}
