//! The `run` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tokio::sync::mpsc;

use oladoc_scraper::config::{RunConfig, RunOverrides};
use oladoc_scraper::dataset::{JsonLinesSink, RecordSink};
use oladoc_scraper::orchestrator::{run_crawl, CrawlEvent};
use oladoc_scraper::scrapers::{HttpClient, RateLimiter};

use crate::cli::icons::{dim_arrow, info, success, warn};
use crate::cli::progress::CrawlProgress;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Specialty path segment (e.g. dermatologist)
    #[arg(long, env = "OLADOC_SPECIALTY")]
    specialty: Option<String>,
    /// City path segment (e.g. lahore)
    #[arg(long, env = "OLADOC_CITY")]
    city: Option<String>,
    /// Country path segment (e.g. pakistan)
    #[arg(long, env = "OLADOC_COUNTRY")]
    country: Option<String>,
    /// Number of doctor records to collect
    #[arg(short = 'n', long = "results", env = "OLADOC_RESULTS_WANTED")]
    results: Option<usize>,
    /// Maximum listing pages to visit
    #[arg(long, env = "OLADOC_MAX_PAGES")]
    max_pages: Option<u32>,
    /// Save listing data only, without visiting profile pages
    #[arg(long)]
    shallow: bool,
    /// Listing URL to start from (overrides specialty/city/country)
    #[arg(long, env = "OLADOC_START_URL")]
    start_url: Option<String>,
    /// Concurrent page requests
    #[arg(short = 'j', long, env = "OLADOC_MAX_CONCURRENCY")]
    concurrency: Option<usize>,
    /// Requests per minute ceiling (minimum 10)
    #[arg(long, env = "OLADOC_MAX_REQUESTS_PER_MINUTE")]
    rpm: Option<u32>,
    /// JSON Lines output file (stdout when omitted)
    #[arg(short, long, env = "OLADOC_OUTPUT")]
    output: Option<PathBuf>,
    /// Show a progress bar
    #[arg(short = 'P', long)]
    progress: bool,
}

impl RunArgs {
    fn overrides(&self) -> RunOverrides {
        RunOverrides {
            specialty: self.specialty.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
            results_wanted: self.results,
            max_pages: self.max_pages,
            shallow: self.shallow,
            start_url: self.start_url.clone(),
            max_concurrency: self.concurrency,
            max_requests_per_minute: self.rpm,
            output: self.output.clone(),
        }
    }
}

/// Crawl and write records.
pub async fn cmd_run(config: RunConfig, args: RunArgs) -> anyhow::Result<()> {
    let config = config.with_overrides(args.overrides()).normalized();
    let start_url = config.start_url()?;

    let sink: Arc<dyn RecordSink> = match &config.output {
        Some(path) => Arc::new(
            JsonLinesSink::open(path)
                .await
                .with_context(|| format!("Failed to open output file {}", path.display()))?,
        ),
        None => Arc::new(JsonLinesSink::stdout()),
    };

    eprintln!(
        "{} Crawling {} ({} records, {} pages max, {})",
        info(),
        start_url,
        config.results_wanted,
        config.max_pages,
        if config.collect_details {
            "with profiles"
        } else {
            "listings only"
        }
    );
    if let Some(path) = &config.output {
        eprintln!("  {} Output: {}", dim_arrow(), path.display());
    }

    let rate_limiter = RateLimiter::per_minute(config.max_requests_per_minute);
    let fetcher = Arc::new(HttpClient::new(
        config.request_handler_timeout(),
        rate_limiter.clone(),
    ));

    // Event channel for progress updates
    let (event_tx, mut event_rx) = mpsc::channel::<CrawlEvent>(100);
    let progress_display = args
        .progress
        .then(|| CrawlProgress::new(config.results_wanted as u64));

    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let Some(ref progress) = progress_display else {
                continue;
            };
            match event {
                CrawlEvent::Saved { name, .. } => progress.record_saved(&name),
                CrawlEvent::ListingProcessed {
                    page_index,
                    new_candidates,
                } => progress.listing_processed(page_index, new_candidates),
            }
        }
        if let Some(progress) = progress_display {
            progress.finish();
        }
    });

    let result = run_crawl(config, fetcher, sink, Some(event_tx)).await;
    let _ = event_handler.await;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    eprintln!(
        "{} Saved {} doctor profiles in {}s",
        success(),
        summary.saved,
        summary.elapsed().num_seconds()
    );
    eprintln!(
        "  {} {} listing pages, {} requests succeeded",
        dim_arrow(),
        summary.list_pages_processed,
        summary.engine.succeeded
    );
    for (domain, stats) in rate_limiter.get_stats().await {
        eprintln!(
            "  {} {}: {} requests, {} throttled, final delay {:?}",
            dim_arrow(),
            domain,
            stats.total_requests,
            stats.rate_limit_hits,
            stats.current_delay
        );
        if stats.in_backoff {
            eprintln!("{} {} was still backing off at the end of the run", warn(), domain);
        }
    }
    if summary.engine.failed > 0 {
        eprintln!(
            "{} {} requests abandoned after retries",
            warn(),
            summary.engine.failed
        );
    }

    Ok(())
}
