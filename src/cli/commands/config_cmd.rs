//! Configuration inspection command.

use oladoc_scraper::config::RunConfig;

use crate::cli::icons::{dim_arrow, info};

/// Print the effective configuration as JSON.
pub fn cmd_config(config: &RunConfig) -> anyhow::Result<()> {
    let config = config.clone().normalized();

    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults (no config file found)".to_string());

    eprintln!("{} Config: {}", info(), source);
    eprintln!("  {} Start URL: {}", dim_arrow(), config.start_url()?);

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
