//! Offline extraction commands for saved HTML pages.

use std::path::Path;

use anyhow::Context;
use scraper::Html;

use oladoc_scraper::models::{CandidateRecord, DoctorRecord};
use oladoc_scraper::scrapers::{extract_detail, extract_listing, next_listing_url};
use oladoc_scraper::utils::id_from_url;

use crate::cli::icons::{dim_arrow, info, warn};

async fn read_page(file: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))
}

/// Print the candidates a listing page yields.
pub async fn cmd_parse_listing(file: &Path, url: &str, city: &str) -> anyhow::Result<()> {
    let html = read_page(file).await?;

    let (extraction, next_url) = {
        let document = Html::parse_document(&html);
        (
            extract_listing(&document, url, city),
            next_listing_url(&document, url),
        )
    };

    eprintln!(
        "{} {} candidates via {:?}",
        info(),
        extraction.candidates.len(),
        extraction.source
    );
    match next_url {
        Some(next) => eprintln!("  {} Next page: {}", dim_arrow(), next),
        None => eprintln!("  {} No next page", dim_arrow()),
    }

    println!("{}", serde_json::to_string_pretty(&extraction.candidates)?);
    Ok(())
}

/// Print the record a profile page yields.
pub async fn cmd_parse_detail(file: &Path, url: &str, city: &str) -> anyhow::Result<()> {
    let html = read_page(file).await?;

    let profile = {
        let document = Html::parse_document(&html);
        extract_detail(&document, url, city)
    };

    let candidate = CandidateRecord {
        id: id_from_url(url).unwrap_or_default(),
        url: url.to_string(),
        ..Default::default()
    };
    let record = DoctorRecord::merge(&candidate, profile, city);

    if !record.is_emittable() {
        eprintln!(
            "{} Record would be skipped during a crawl (missing name or id)",
            warn()
        );
    }

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
