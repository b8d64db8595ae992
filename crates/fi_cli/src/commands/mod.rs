pub mod check_config;
pub mod clean;
pub mod validate;

use anyhow::{Context, Result};
use fi_domain::{LocalizedMessage, WikitextConversions};
use fi_engine::CommonsHelperConfigParser;
use std::path::Path;

pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Parse the CommonsHelper page at `path`. The page name in error messages
/// is the file path.
pub(crate) fn load_conversions(path: &Path) -> Result<WikitextConversions> {
    let wikitext = read_file(path)?;
    let parser = CommonsHelperConfigParser::new(path.display().to_string(), &wikitext);
    parser.parse().map_err(|e| {
        tracing::error!(key = e.key(), params = ?e.params(), "configuration rejected");
        anyhow::Error::new(e).context(format!("invalid CommonsHelper configuration in {}", path.display()))
    })
}
