//! The cleanup run for one imported file description page: link rewriting,
//! then template and heading cleanup, then the edit summary and a review
//! diff.

use crate::content_cleaner::WikitextContentCleaner;
use crate::diff_engine::{DiffStats, diff_stats, unified_diff};
use crate::settings::{ImporterSettings, SettingsError};
use crate::wiki_link::WikiLinkParser;
use fi_domain::{LocalizedMessage, WikitextConversions};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

const DIFF_CONTEXT_LINES: usize = 3;

/// Edit summary for the automatic replacements made during an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplacementSummary {
    pub replacements: usize,
}

impl LocalizedMessage for ReplacementSummary {
    fn key(&self) -> &'static str {
        "fileimporter-auto-replacements-summary"
    }

    fn params(&self) -> Vec<String> {
        vec![self.replacements.to_string()]
    }
}

impl fmt::Display for ReplacementSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Automatic conversion of {} template(s)", self.replacements)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub wikitext: String,
    /// Link targets rewritten by the link cleaners.
    pub link_changes: usize,
    /// Templates renamed or removed.
    pub template_replacements: usize,
    /// `None` when no template was replaced.
    pub summary: Option<ReplacementSummary>,
    pub diff: String,
    pub diff_stats: DiffStats,
}

impl CleanupReport {
    pub fn is_unchanged(&self) -> bool {
        self.diff_stats.is_empty()
    }
}

pub struct ImportPlan {
    link_parser: WikiLinkParser,
    cleaner: WikitextContentCleaner,
}

impl ImportPlan {
    pub fn new(settings: &ImporterSettings, conversions: Arc<WikitextConversions>) -> Result<Self, SettingsError> {
        settings.validate()?;
        let mut cleaner = WikitextContentCleaner::new(conversions);
        if let Some(template) = &settings.language_template {
            cleaner.set_source_wiki_language_template(template.as_str());
        }
        Ok(Self {
            link_parser: WikiLinkParser::from_settings(settings),
            cleaner,
        })
    }

    pub fn clean(&mut self, wikitext: &str) -> CleanupReport {
        let (linked, link_changes) = self.link_parser.parse_counting(wikitext);
        let cleaned = self.cleaner.clean_wikitext(&linked);
        let template_replacements = self.cleaner.latest_number_of_replacements();

        let summary = (template_replacements > 0).then_some(ReplacementSummary {
            replacements: template_replacements,
        });
        let stats = diff_stats(wikitext, &cleaned);
        tracing::info!(
            link_changes,
            template_replacements,
            added = stats.added,
            removed = stats.removed,
            "cleaned file description page"
        );

        CleanupReport {
            diff: unified_diff(wikitext, &cleaned, DIFF_CONTEXT_LINES),
            wikitext: cleaned,
            link_changes,
            template_replacements,
            summary,
            diff_stats: stats,
        }
    }
}
