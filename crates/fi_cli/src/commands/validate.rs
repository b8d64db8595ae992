use anyhow::{Context, Result, bail};
use console::style;
use fi_domain::{LocalizedMessage, PageRef};
use fi_engine::FileDescriptionPageValidator;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// The "templates used" and "categories used" lists of a page, as returned
/// by the parse API.
#[derive(Debug, Deserialize)]
struct PageLists {
    #[serde(default)]
    templates: Vec<PageRef>,
    #[serde(default)]
    categories: Vec<PageRef>,
}

pub fn run(config: &Path, page: &Path) -> Result<()> {
    let conversions = Arc::new(super::load_conversions(config)?);
    let lists: PageLists = serde_json::from_str(&super::read_file(page)?)
        .with_context(|| format!("invalid page JSON in {}", page.display()))?;

    let validator = FileDescriptionPageValidator::new(conversions);
    match validator.validate(&lists.templates, &lists.categories) {
        Ok(()) => {
            println!(
                "{} Validation passed ({} templates, {} categories)",
                style("✓").green().bold(),
                lists.templates.len(),
                lists.categories.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", style("✗").red().bold(), e);
            println!("  {} {}", style("message:").dim(), e.key());
            bail!("validation failed: {e}")
        }
    }
}
