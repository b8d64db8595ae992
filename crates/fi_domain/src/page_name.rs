//! Page-name normalization used for every rule lookup.
//!
//! MediaWiki treats underscores and spaces identically and the rules on a
//! CommonsHelper page are written without regard to case, so lookups compare
//! the trimmed, space-separated, Unicode-lowercased form.

/// Normalize a page name for comparison: `_` becomes a space, surrounding
/// whitespace is trimmed, and the result is lowercased (full Unicode).
pub fn normalize(name: &str) -> String {
    name.replace('_', " ").trim().to_lowercase()
}

/// Drop everything up to and including the first `:`.
///
/// This intentionally does not check whether the prefix is a real namespace:
/// template and category names in the rule set never contain a colon.
pub fn strip_namespace(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, rest)) => rest,
        None => name,
    }
}

/// [`normalize`] after [`strip_namespace`].
pub fn normalize_without_namespace(name: &str) -> String {
    normalize(strip_namespace(name))
}
