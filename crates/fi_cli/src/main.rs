use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "file-importer")]
#[command(version, about = "Clean and validate file description pages for cross-wiki file imports", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CommonsHelper configuration page and report its rules
    CheckConfig {
        /// CommonsHelper page wikitext
        #[arg(long)]
        config: PathBuf,

        /// URL of a file on the source wiki; prints the matching config page
        #[arg(long)]
        source_url: Option<Url>,

        /// Print the rule counts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Clean a file description page for import
    Clean {
        /// CommonsHelper page wikitext
        #[arg(long)]
        config: PathBuf,

        /// File description page wikitext
        #[arg(long)]
        input: PathBuf,

        /// Target wiki settings (TOML)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Also print a unified diff against the input
        #[arg(long)]
        diff: bool,
    },

    /// Check the templates and categories of a file description page
    Validate {
        /// CommonsHelper page wikitext
        #[arg(long)]
        config: PathBuf,

        /// JSON document with "templates" and "categories" lists
        #[arg(long)]
        page: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    fi_telemetry::init_telemetry(&fi_telemetry::TelemetryConfig {
        level: fi_telemetry::parse_level(&cli.log_level)?,
        json_output: cli.json_logs,
    })
    .context("failed to set up logging")?;

    match cli.command {
        Commands::CheckConfig {
            config,
            source_url,
            json,
        } => commands::check_config::run(&config, source_url.as_ref(), json),
        Commands::Clean {
            config,
            input,
            settings,
            diff,
        } => commands::clean::run(&config, &input, settings.as_deref(), diff),
        Commands::Validate { config, page } => commands::validate::run(&config, &page),
    }
}
