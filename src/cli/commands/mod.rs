//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod crawl;
mod parse;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use oladoc_scraper::config::RunConfig;

#[derive(Parser)]
#[command(name = "oladoc")]
#[command(about = "Collect doctor profiles from oladoc.com listings")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "OLADOC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages (and profiles) and write doctor records as JSON Lines
    Run(crawl::RunArgs),

    /// Run the listing extractor on a saved HTML file
    ParseListing {
        /// Saved listing page
        file: PathBuf,
        /// URL the page was fetched from (for resolving links)
        #[arg(long)]
        url: Option<String>,
        /// City stamped on candidates (defaults to the configured city)
        #[arg(long)]
        city: Option<String>,
    },

    /// Run the detail extractor on a saved HTML file
    ParseDetail {
        /// Saved profile page
        file: PathBuf,
        /// URL the page was fetched from
        #[arg(long)]
        url: String,
        /// City stamped on the record (defaults to the configured city)
        #[arg(long)]
        city: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RunConfig::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Run(args) => crawl::cmd_run(config, args).await,
        Commands::ParseListing { file, url, city } => {
            let url = match url {
                Some(url) => url,
                None => config.start_url()?,
            };
            let city = city.unwrap_or(config.city);
            parse::cmd_parse_listing(&file, &url, &city).await
        }
        Commands::ParseDetail { file, url, city } => {
            let city = city.unwrap_or(config.city);
            parse::cmd_parse_detail(&file, &url, &city).await
        }
        Commands::Config => config_cmd::cmd_config(&config),
    }
}
