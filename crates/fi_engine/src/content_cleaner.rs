//! Rewrites the templates and headings of a file description page according
//! to a [`WikitextConversions`] ruleset.
//!
//! The cleaner never fails. Everything it does not mean to change is kept
//! byte for byte; unclosed templates and other oddities found in arbitrary
//! wikitext are tolerated rather than rejected.

use crate::edits::{TextEdit, apply_edits};
use crate::template_scanner::{
    ParameterFormat, ParameterKind, ParsedTemplate, find_template_starts, parse_template,
};
use fi_domain::WikitextConversions;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

pub struct WikitextContentCleaner {
    conversions: Arc<WikitextConversions>,
    source_wiki_language_template: Option<String>,
    latest_number_of_replacements: usize,
}

impl WikitextContentCleaner {
    pub fn new(conversions: Arc<WikitextConversions>) -> Self {
        Self {
            conversions,
            source_wiki_language_template: None,
            latest_number_of_replacements: 0,
        }
    }

    /// Template used to mark the language of transferred free-text values,
    /// e.g. `de` to produce `{{de|...}}`.
    pub fn with_source_wiki_language_template(mut self, template: impl Into<String>) -> Self {
        self.set_source_wiki_language_template(template);
        self
    }

    pub fn set_source_wiki_language_template(&mut self, template: impl Into<String>) {
        let template = template.into();
        self.source_wiki_language_template = if template.trim().is_empty() {
            None
        } else {
            Some(template.trim().to_string())
        };
    }

    /// Number of templates renamed or removed by the last
    /// [`clean_wikitext`](Self::clean_wikitext) call.
    pub fn latest_number_of_replacements(&self) -> usize {
        self.latest_number_of_replacements
    }

    pub fn clean_wikitext(&mut self, wikitext: &str) -> String {
        self.latest_number_of_replacements = 0;
        let headings = self.clean_headings(wikitext);
        let templates = self.clean_templates(&headings);
        info!(
            replacements = self.latest_number_of_replacements,
            "cleaned wikitext"
        );
        templates.trim().to_string()
    }

    fn clean_headings(&self, wikitext: &str) -> String {
        static RE: OnceLock<fancy_regex::Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            fancy_regex::Regex::new(r"(?m)^(=+)([ \t]*)(.*?)([ \t]*\1)$")
                .expect("known-valid regex")
        });

        let mut edits = Vec::new();
        for caps in re.captures_iter(wikitext) {
            let Ok(caps) = caps else { break };
            let Some(text) = caps.get(3) else { continue };
            let replacement = self.conversions.swap_heading(text.as_str());
            if replacement != text.as_str() {
                debug!(heading = text.as_str(), replacement, "replacing heading");
                edits.push(TextEdit::replace(text.start()..text.end(), replacement));
            }
        }
        apply_edits(wikitext, edits)
    }

    fn clean_templates(&mut self, wikitext: &str) -> String {
        let starts = find_template_starts(wikitext);
        let mut edits = Vec::new();
        let mut removed_any = false;

        // Later templates first, mirroring the order in which nested
        // invocations get resolved.
        for start in starts.iter().rev() {
            let name = &wikitext[start.name.clone()];
            let is_obsolete = self.conversions.is_obsolete_template(name);
            let target = self.conversions.swap_template(name);
            if !is_obsolete && target.is_none() {
                continue;
            }

            let parsed = parse_template(wikitext, start.name.end);
            self.latest_number_of_replacements += 1;

            if is_obsolete {
                debug!(template = name, "removing obsolete template");
                edits.push(TextEdit::remove(start.start..parsed.end));
                removed_any = true;
                continue;
            }

            if let Some(target) = target {
                debug!(template = name, target, "renaming template");
                self.rename_template_parameters(wikitext, name, &parsed, &mut edits);
                self.add_required_template_parameters(name, &parsed, start.name.end, &mut edits);
                edits.push(TextEdit::replace(start.name.clone(), target));
            }
        }

        let cleaned = apply_edits(wikitext, edits);
        if removed_any {
            collapse_blank_lines(&cleaned)
        } else {
            cleaned
        }
    }

    fn rename_template_parameters(
        &self,
        wikitext: &str,
        template: &str,
        parsed: &ParsedTemplate,
        edits: &mut Vec<TextEdit>,
    ) {
        let Some(replacements) = self.conversions.template_parameters(template) else {
            return;
        };

        for parameter in parsed.parameters.iter().rev() {
            let Some(replacement) = replacements.get(&parameter.name) else {
                continue;
            };
            let value = value_after_edits(wikitext, &parameter.value, edits);

            match &parameter.kind {
                ParameterKind::Named { range } => {
                    edits.push(TextEdit::replace(range.clone(), replacement.target.clone()));
                }
                ParameterKind::Positional { .. } => {
                    edits.push(TextEdit::insert(
                        parameter.offset,
                        format!("{}=", replacement.target),
                    ));
                }
            }

            if !replacement.add_language_template {
                continue;
            }
            let Some(language) = &self.source_wiki_language_template else {
                continue;
            };
            if value.is_empty() || is_language_wrapped(&value, language) {
                continue;
            }
            edits.push(TextEdit::insert(
                parameter.value.start,
                format!("{{{{{language}|"),
            ));
            edits.push(TextEdit::insert(parameter.value.end, "}}"));
        }
    }

    fn add_required_template_parameters(
        &self,
        template: &str,
        parsed: &ParsedTemplate,
        end_of_name: usize,
        edits: &mut Vec<TextEdit>,
    ) {
        let Some(required) = self.conversions.required_template_parameters(template) else {
            return;
        };

        let present: HashSet<&str> = parsed.parameters.iter().map(|p| p.name.as_str()).collect();
        let default_format = ParameterFormat::default();
        let format = parsed
            .parameters
            .first()
            .map(|p| &p.format)
            .unwrap_or(&default_format);

        let addition: String = required
            .iter()
            .filter(|(name, _)| !present.contains(name.as_str()))
            .map(|(name, value)| format.render(name, value))
            .collect();
        if !addition.is_empty() {
            edits.push(TextEdit::insert(end_of_name, addition));
        }
    }
}

/// The text of `range` as it reads once the edits already collected for
/// templates nested inside it are applied.
fn value_after_edits(text: &str, range: &Range<usize>, edits: &[TextEdit]) -> String {
    let nested: Vec<TextEdit> = edits
        .iter()
        .filter(|edit| edit.range.start >= range.start && edit.range.end <= range.end)
        .map(|edit| {
            TextEdit::replace(
                edit.range.start - range.start..edit.range.end - range.start,
                edit.replacement.clone(),
            )
        })
        .collect();
    apply_edits(&text[range.clone()], nested)
}

/// Whether `value` already starts with a language marker: a template named
/// with two letters or with the source wiki's language template.
fn is_language_wrapped(value: &str, language: &str) -> bool {
    let Some(inner) = value.strip_prefix("{{") else {
        return false;
    };
    let Some((name, _)) = inner.split_once('|') else {
        return false;
    };
    let name = name.trim();
    name.eq_ignore_ascii_case(language)
        || (name.len() == 2 && name.bytes().all(|b| b.is_ascii_alphabetic()))
}

/// Collapse two or more blank lines into one.
fn collapse_blank_lines(text: &str) -> String {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"\n\s*\n\s*\n").expect("known-valid regex"));
    re.replace_all(text, "\n\n").into_owned()
}
