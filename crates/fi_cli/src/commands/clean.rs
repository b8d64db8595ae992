use anyhow::{Context, Result};
use console::style;
use fi_engine::{ImportPlan, ImporterSettings};
use std::path::Path;
use std::sync::Arc;

pub fn run(config: &Path, input: &Path, settings: Option<&Path>, show_diff: bool) -> Result<()> {
    let conversions = Arc::new(super::load_conversions(config)?);
    let settings = match settings {
        Some(path) => ImporterSettings::from_toml(&super::read_file(path)?)
            .with_context(|| format!("invalid settings in {}", path.display()))?,
        None => ImporterSettings::default(),
    };
    let wikitext = super::read_file(input)?;

    let mut plan = ImportPlan::new(&settings, conversions).context("invalid settings")?;
    let report = plan.clean(&wikitext);

    println!("{}", report.wikitext);
    eprintln!();
    match &report.summary {
        Some(summary) => eprintln!("{} {}", style("Summary:").bold(), summary),
        None => eprintln!("{}", style("No templates replaced").dim()),
    }
    eprintln!(
        "{} link(s) rewritten, {} line(s) added, {} line(s) removed",
        style(report.link_changes).yellow(),
        style(report.diff_stats.added).green(),
        style(report.diff_stats.removed).red()
    );

    if show_diff && !report.diff.is_empty() {
        eprintln!();
        for line in report.diff.lines() {
            let styled = match line.chars().next() {
                Some('+') if !line.starts_with("+++") => style(line).green(),
                Some('-') if !line.starts_with("---") => style(line).red(),
                Some('@') => style(line).cyan(),
                _ => style(line),
            };
            eprintln!("{styled}");
        }
    }
    Ok(())
}
