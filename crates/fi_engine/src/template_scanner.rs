//! Template tokenizer used by the content cleaner.
//!
//! Scanning happens in two steps. [`find_template_starts`] is a cheap regex
//! pass that only locates `{{Name` openings; it makes no attempt to balance
//! braces. [`parse_template`] is the expensive part and runs only for the
//! templates a rule actually applies to: a single forward pass that tracks
//! brace nesting and wiki links to split the invocation into parameters.
//!
//! Both functions are read-only and report byte offsets into the scanned
//! text. They never fail: an unclosed template extends to the end of text.

use std::ops::Range;
use std::sync::OnceLock;

/// The opening of a `{{Name` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStart {
    /// Offset of the opening `{{`.
    pub start: usize,
    /// Span of the template name, without surrounding whitespace.
    pub name: Range<usize>,
}

/// Find the start of every `{{Name|` or `{{Name}}` that is not itself
/// preceded by `{` (which would make it a parameter placeholder or
/// something stranger).
pub fn find_template_starts(text: &str) -> Vec<TemplateStart> {
    static RE: OnceLock<fancy_regex::Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        fancy_regex::Regex::new(r"(?<!\{)\{\{\s*([^{|}]+?)\s*(?=\||\}\})")
            .expect("known-valid regex")
    });

    let mut starts = Vec::new();
    for caps in re.captures_iter(text) {
        let caps = match caps {
            Ok(caps) => caps,
            Err(e) => {
                tracing::warn!(error = %e, "template scan aborted");
                break;
            }
        };
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let raw = name.as_str();
        let leading = raw.len() - raw.trim_start().len();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let name_start = name.start() + leading;
        starts.push(TemplateStart {
            start: whole.start(),
            name: name_start..name_start + trimmed.len(),
        });
    }
    starts
}

/// How a parameter was addressed in the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// `|name=value`; `range` is the trimmed name.
    Named { range: Range<usize> },
    /// `|value`, numbered by declaration order among unnamed parameters.
    Positional { number: u32 },
}

/// Whitespace around the delimiters of one parameter, used to give new
/// parameters the same look as existing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterFormat {
    pub before_pipe: String,
    pub before_name: String,
    pub before_equals: String,
    pub after_equals: String,
}

impl ParameterFormat {
    /// Render `|name=value` in this format. The default format renders the
    /// compact `|name=value`.
    pub fn render(&self, name: &str, value: &str) -> String {
        format!(
            "{}|{}{}{}={}{}",
            self.before_pipe, self.before_name, name, self.before_equals, self.after_equals, value
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpan {
    /// Offset right after the `|` introducing the parameter.
    pub offset: usize,
    /// Explicit name, or the position number as a string.
    pub name: String,
    pub kind: ParameterKind,
    /// Span of the trimmed value.
    pub value: Range<usize>,
    pub format: ParameterFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate {
    pub parameters: Vec<ParameterSpan>,
    /// Offset just past the closing braces, or the text length when the
    /// template is never closed.
    pub end: usize,
    pub closed: bool,
}

struct Segment {
    pipe: usize,
    equals: Option<usize>,
}

/// Parse the invocation whose name ends at `from`.
pub fn parse_template(text: &str, from: usize) -> ParsedTemplate {
    let bytes = text.as_bytes();
    let len = bytes.len();
    // Width (2 or 3) of every open nested `{{`/`{{{`.
    let mut nesting: Vec<usize> = Vec::new();
    let mut in_link = false;
    let mut segments: Vec<Segment> = Vec::new();
    let mut content_end = len;
    let mut end = len;
    let mut closed = false;

    let mut i = from;
    while i < len {
        let rest = &bytes[i..];
        if rest.starts_with(b"[[") {
            in_link = true;
            i += 2;
        } else if rest.starts_with(b"]]") {
            in_link = false;
            i += 2;
        } else if rest.starts_with(b"{{{") {
            nesting.push(3);
            i += 3;
        } else if rest.starts_with(b"{{") {
            nesting.push(2);
            i += 2;
        } else if bytes[i] == b'}' {
            match nesting.last() {
                None => {
                    content_end = i;
                    end = if rest.starts_with(b"}}") { i + 2 } else { i + 1 };
                    closed = true;
                    break;
                }
                Some(&3) if rest.starts_with(b"}}}") => {
                    nesting.pop();
                    i += 3;
                }
                Some(_) if rest.starts_with(b"}}") => {
                    nesting.pop();
                    i += 2;
                }
                Some(_) => i += 1,
            }
        } else {
            if nesting.is_empty() && !in_link {
                match bytes[i] {
                    b'|' => segments.push(Segment {
                        pipe: i,
                        equals: None,
                    }),
                    b'=' => {
                        if let Some(segment) = segments.last_mut() {
                            segment.equals.get_or_insert(i);
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }
    }

    if !closed {
        tracing::warn!(offset = from, "unclosed template, treating it as extending to the end of text");
    }

    let mut parameters = Vec::with_capacity(segments.len());
    let mut number = 0u32;
    for (index, segment) in segments.iter().enumerate() {
        let segment_end = segments
            .get(index + 1)
            .map(|next| next.pipe)
            .unwrap_or(content_end);
        let previous_end = if index == 0 {
            from
        } else {
            segments[index - 1].pipe + 1
        };
        let before_pipe = trailing_whitespace(&text[previous_end..segment.pipe]);
        let offset = segment.pipe + 1;

        match segment.equals {
            Some(equals) => {
                let name = trim_range(text, offset..equals);
                let value = trim_range(text, equals + 1..segment_end);
                parameters.push(ParameterSpan {
                    offset,
                    name: text[name.clone()].to_string(),
                    format: ParameterFormat {
                        before_pipe: before_pipe.to_string(),
                        before_name: text[offset..name.start].to_string(),
                        before_equals: text[name.end..equals].to_string(),
                        after_equals: text[equals + 1..value.start].to_string(),
                    },
                    kind: ParameterKind::Named { range: name },
                    value,
                });
            }
            None => {
                number += 1;
                parameters.push(ParameterSpan {
                    offset,
                    name: number.to_string(),
                    kind: ParameterKind::Positional { number },
                    value: trim_range(text, offset..segment_end),
                    format: ParameterFormat {
                        before_pipe: before_pipe.to_string(),
                        ..Default::default()
                    },
                });
            }
        }
    }

    ParsedTemplate {
        parameters,
        end,
        closed,
    }
}

fn trim_range(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.end - (slice.len() - slice.trim_end().len());
    if start > end { start..start } else { start..end }
}

fn trailing_whitespace(s: &str) -> &str {
    &s[s.trim_end().len()..]
}
