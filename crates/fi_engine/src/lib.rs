//! Import cleanup engine: parses CommonsHelper rule pages, rewrites
//! templates, headings and wiki links of a file description page, and
//! validates it against the ruleset.

pub mod commonshelper;
pub mod content_cleaner;
pub mod diff_engine;
pub mod edits;
pub mod import_plan;
pub mod namespace_util;
pub mod settings;
pub mod template_scanner;
pub mod validator;
pub mod wiki_link;

pub use commonshelper::{CommonsHelperConfigParser, ConfigParseError, config_page_title};
pub use content_cleaner::WikitextContentCleaner;
pub use import_plan::{CleanupReport, ImportPlan, ReplacementSummary};
pub use settings::{ImporterSettings, SettingsError};
pub use validator::{FileDescriptionPageValidator, ValidationError, WikitextContentValidator};
pub use wiki_link::{
    NamespaceUnlocalizer, WikiLinkCleaner, WikiLinkParser, WikiLinkPrefixer,
};
