//! Crawl orchestration for oladoc listings.
//!
//! [`DoctorCrawl`] is the page handler driven by the crawl engine. Listing
//! pages yield candidates that are either emitted directly (shallow runs) or
//! queued as detail requests; detail pages are merged with their candidate
//! and emitted. All budget and de-duplication state lives in one
//! mutex-guarded [`RunState`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::crawler::{
    CrawlEngine, CrawlRequest, EngineConfig, EngineStats, FetchedPage, PageFetcher, PageHandler,
    PageLabel, RequestQueue, SessionPool,
};
use crate::dataset::RecordSink;
use crate::error::{CrawlError, PageError};
use crate::models::{CandidateRecord, DoctorRecord};
use crate::scrapers::page_checks::is_no_results_listing;
use crate::scrapers::{
    check_listing_page, extract_detail, extract_listing, is_likely_blocked_or_wrong_page,
    next_listing_url, ListingPageCheck,
};
use crate::utils::id_from_url;

/// Progress notifications for the command line.
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    /// A record was written to the dataset.
    Saved { id: String, name: String },
    /// A listing page was processed.
    ListingProcessed { page_index: u32, new_candidates: usize },
}

/// Mutable state for one run. Never persisted.
#[derive(Debug, Default)]
pub struct RunState {
    pub seen_ids: HashSet<String>,
    pub saved: usize,
    pub enqueued_details: usize,
    pub list_pages_processed: usize,
}

/// Final counters for a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub saved: usize,
    pub enqueued_details: usize,
    pub list_pages_processed: usize,
    pub engine: EngineStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// What a listing page yielded, computed before any await.
enum ListingOutcome {
    Blocked(String),
    Parsed {
        candidates: Vec<CandidateRecord>,
        next_url: Option<String>,
        shows_no_results: bool,
    },
}

/// Page handler implementing the listing/detail state machine.
pub struct DoctorCrawl {
    config: RunConfig,
    queue: RequestQueue,
    sink: Arc<dyn RecordSink>,
    state: Mutex<RunState>,
    events: Option<mpsc::Sender<CrawlEvent>>,
}

impl DoctorCrawl {
    pub fn new(config: RunConfig, queue: RequestQueue, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            config: config.normalized(),
            queue,
            sink,
            state: Mutex::new(RunState::default()),
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::Sender<CrawlEvent>) -> Self {
        self.events = Some(events);
        self
    }

    async fn notify(&self, event: CrawlEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Counters so far, stamped with the given start time.
    pub async fn summary(&self, started_at: DateTime<Utc>, engine: EngineStats) -> RunSummary {
        let state = self.state.lock().await;
        RunSummary {
            saved: state.saved,
            enqueued_details: state.enqueued_details,
            list_pages_processed: state.list_pages_processed,
            engine,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn handle_listing(
        &self,
        request: &CrawlRequest,
        page: &FetchedPage,
    ) -> Result<(), PageError> {
        let city = &self.config.city;
        let wanted = self.config.results_wanted;

        let outcome = {
            let document = Html::parse_document(&page.body);
            match check_listing_page(&document) {
                ListingPageCheck::Blocked(reason) => ListingOutcome::Blocked(reason),
                ListingPageCheck::NoResults => ListingOutcome::Parsed {
                    candidates: Vec::new(),
                    next_url: None,
                    shows_no_results: true,
                },
                ListingPageCheck::Usable => ListingOutcome::Parsed {
                    candidates: extract_listing(&document, &request.url, city).candidates,
                    next_url: next_listing_url(&document, &request.url),
                    shows_no_results: is_no_results_listing(&document),
                },
            }
        };

        let (candidates, next_url, shows_no_results) = match outcome {
            ListingOutcome::Blocked(reason) => return Err(PageError::Blocked { reason }),
            ListingOutcome::Parsed {
                candidates,
                next_url,
                shows_no_results,
            } => (candidates, next_url, shows_no_results),
        };

        let (to_emit, to_enqueue, budget_reached, new_count) = {
            let mut state = self.state.lock().await;
            state.list_pages_processed += 1;

            let fresh: Vec<CandidateRecord> = candidates
                .into_iter()
                .filter(|c| !state.seen_ids.contains(&c.id))
                .collect();
            let new_count = fresh.len();

            info!(
                "Extracted {} unique doctors from listing (page {})",
                new_count, request.page_index
            );

            if fresh.is_empty() && shows_no_results {
                info!("No results for this query; stopping pagination.");
                drop(state);
                self.notify(CrawlEvent::ListingProcessed {
                    page_index: request.page_index,
                    new_candidates: 0,
                })
                .await;
                return Ok(());
            }

            let mut to_emit = Vec::new();
            let mut to_enqueue = Vec::new();

            if self.config.collect_details {
                let remaining = wanted.saturating_sub(state.enqueued_details);
                to_enqueue = fresh.into_iter().take(remaining).collect::<Vec<_>>();
                for candidate in &to_enqueue {
                    state.seen_ids.insert(candidate.id.clone());
                }
                state.enqueued_details += to_enqueue.len();
            } else {
                let remaining = wanted.saturating_sub(state.saved);
                for candidate in fresh {
                    if to_emit.len() >= remaining {
                        break;
                    }
                    let record = DoctorRecord::from_candidate(&candidate, city);
                    if !record.is_emittable() {
                        warn!("[LIST] Skipping {}: no name", candidate.url);
                        continue;
                    }
                    state.seen_ids.insert(candidate.id.clone());
                    to_emit.push(record);
                }
                state.saved += to_emit.len();
            }

            let budget_reached = if self.config.collect_details {
                state.enqueued_details >= wanted
            } else {
                state.saved >= wanted
            };
            (to_emit, to_enqueue, budget_reached, new_count)
        };

        if !self.config.collect_details {
            for record in &to_emit {
                self.emit(record).await?;
            }
            if !to_emit.is_empty() {
                let total = self.state.lock().await.saved;
                info!("Saved {} doctors (total {}/{})", to_emit.len(), total, wanted);
            }
        } else {
            let count = to_enqueue.len();
            for candidate in to_enqueue {
                self.queue.add(CrawlRequest::detail(candidate)).await;
            }
            let total = self.state.lock().await.enqueued_details;
            info!("Enqueued {} detail pages (total {}/{})", count, total, wanted);
        }

        self.notify(CrawlEvent::ListingProcessed {
            page_index: request.page_index,
            new_candidates: new_count,
        })
        .await;

        if budget_reached {
            debug!("Results budget reached; not paginating further");
            return Ok(());
        }
        if request.page_index >= self.config.max_pages {
            info!("Reached page limit ({})", self.config.max_pages);
            return Ok(());
        }

        match next_url {
            Some(next) => {
                if self
                    .queue
                    .add(CrawlRequest::listing(next.clone(), request.page_index + 1))
                    .await
                {
                    info!("Enqueued next listing page: {}", next);
                }
            }
            None => info!("No next listing page found"),
        }

        Ok(())
    }

    async fn handle_detail(
        &self,
        request: &CrawlRequest,
        page: &FetchedPage,
    ) -> Result<(), PageError> {
        let wanted = self.config.results_wanted;

        if self.state.lock().await.saved >= wanted {
            debug!("[DETAIL] Budget met, skipping {}", request.url);
            return Ok(());
        }

        let profile = {
            let document = Html::parse_document(&page.body);
            if is_likely_blocked_or_wrong_page(&document) {
                None
            } else {
                Some(extract_detail(&document, &request.url, &self.config.city))
            }
        };
        let Some(profile) = profile else {
            return Err(PageError::Blocked {
                reason: "blocked or unexpected detail HTML (no doctor markers)".to_string(),
            });
        };

        let candidate = request.candidate.clone().unwrap_or_else(|| CandidateRecord {
            id: id_from_url(&request.url).unwrap_or_default(),
            url: request.url.clone(),
            ..Default::default()
        });
        let record = DoctorRecord::merge(&candidate, profile, &self.config.city);

        if !record.is_emittable() {
            warn!("[DETAIL] Skipping {}: no name after merge", request.url);
            return Ok(());
        }

        let total = {
            let mut state = self.state.lock().await;
            if state.saved >= wanted {
                debug!("[DETAIL] Budget met, skipping {}", request.url);
                return Ok(());
            }
            state.saved += 1;
            state.seen_ids.insert(record.id.clone());
            state.saved
        };

        self.emit(&record).await?;
        info!("Saved doctor {} ({}/{})", record.name, total, wanted);
        Ok(())
    }

    async fn emit(&self, record: &DoctorRecord) -> Result<(), PageError> {
        self.sink.emit(record).await?;
        self.notify(CrawlEvent::Saved {
            id: record.id.clone(),
            name: record.name.clone(),
        })
        .await;
        Ok(())
    }
}

#[async_trait]
impl PageHandler for DoctorCrawl {
    async fn handle(&self, request: &CrawlRequest, page: FetchedPage) -> Result<(), PageError> {
        let label = request.label;
        info!("[{}] {} {}", label, page.status, request.url);

        match page.status {
            404 | 410 => return Err(PageError::NotFound { status: page.status }),
            403 | 429 => {
                return Err(PageError::Blocked {
                    reason: format!("HTTP {}", page.status),
                })
            }
            status if status >= 500 => {
                return Err(PageError::Fetch(format!("HTTP {}", status)));
            }
            status if status >= 400 => {
                warn!("[{}] HTTP {} for {}, skipping", label, status, request.url);
                return Ok(());
            }
            _ => {}
        }

        match label {
            PageLabel::Listing => self.handle_listing(request, &page).await,
            PageLabel::Detail => self.handle_detail(request, &page).await,
        }
    }
}

/// Run a complete crawl and flush the sink.
pub async fn run_crawl(
    config: RunConfig,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn RecordSink>,
    events: Option<mpsc::Sender<CrawlEvent>>,
) -> Result<RunSummary, CrawlError> {
    let started_at = Utc::now();
    let config = config.normalized();
    let start_url = config.start_url()?;
    config.proxy_configuration.validate()?;

    info!(
        "Starting crawl at {} (results wanted: {}, max pages: {}, details: {})",
        start_url, config.results_wanted, config.max_pages, config.collect_details
    );

    let queue = RequestQueue::new();
    queue.add(CrawlRequest::listing(start_url, 1)).await;

    let sessions = SessionPool::new(
        config.max_concurrency,
        config.proxy_configuration.proxy_urls.clone(),
    );
    let engine_config = EngineConfig {
        max_concurrency: config.max_concurrency,
        max_request_retries: config.max_request_retries,
        request_handler_timeout: config.request_handler_timeout(),
    };

    let mut handler = DoctorCrawl::new(config, queue.clone(), sink.clone());
    if let Some(tx) = events {
        handler = handler.with_events(tx);
    }
    let handler = Arc::new(handler);

    let engine = CrawlEngine::new(engine_config, queue, sessions, fetcher, handler.clone());
    let result = engine.run().await;

    sink.flush().await.map_err(CrawlError::Flush)?;

    let summary = handler.summary(started_at, result?).await;

    info!("Scraping completed. Saved {} doctor profiles.", summary.saved);
    Ok(summary)
}
