use anyhow::Result;
use console::style;
use fi_engine::config_page_title;
use std::path::Path;
use url::Url;

pub fn run(config: &Path, source_url: Option<&Url>, json: bool) -> Result<()> {
    let conversions = super::load_conversions(config)?;
    let stats = conversions.stats();
    let title = source_url.map(config_page_title).transpose()?;

    if json {
        let report = serde_json::json!({
            "configPage": title,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", style("✓").green().bold(), style("Configuration is valid").bold());
    if let Some(title) = title {
        println!("Config page: {}", style(title).cyan());
    }
    println!("  Required templates:       {}", stats.required_templates);
    println!("  Forbidden templates:      {}", stats.forbidden_templates);
    println!("  Forbidden categories:     {}", stats.forbidden_categories);
    println!("  Obsolete templates:       {}", stats.obsolete_templates);
    println!("  Template transformations: {}", stats.template_transformations);
    println!("  Heading replacements:     {}", stats.heading_replacements);
    Ok(())
}
