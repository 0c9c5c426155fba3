//! Minimal crawl engine: request queue, session pool and worker pool.
//!
//! The engine knows nothing about doctors. It fetches [`CrawlRequest`]s via a
//! [`PageFetcher`] and hands each response to a [`PageHandler`], which may
//! enqueue follow-up requests through the shared [`RequestQueue`].

mod engine;
mod queue;
mod session;

pub use engine::{CrawlEngine, EngineConfig, EngineStats};
pub use queue::RequestQueue;
pub use session::{Session, SessionPool, MAX_SESSION_ERRORS};

use async_trait::async_trait;

use crate::error::PageError;
use crate::models::CandidateRecord;

/// Page-type tag carried by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabel {
    Listing,
    Detail,
}

impl PageLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageLabel::Listing => "LIST",
            PageLabel::Detail => "DETAIL",
        }
    }
}

impl std::fmt::Display for PageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued page fetch.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub url: String,
    /// At-most-once key; the queue ignores repeats.
    pub unique_key: String,
    pub label: PageLabel,
    /// 1-based listing page number (listing requests only).
    pub page_index: u32,
    /// Listing-stage record carried to the detail page.
    pub candidate: Option<CandidateRecord>,
    pub retry_count: u32,
}

impl CrawlRequest {
    pub fn listing(url: impl Into<String>, page_index: u32) -> Self {
        let url = url.into();
        Self {
            unique_key: format!("LIST:{}", url),
            url,
            label: PageLabel::Listing,
            page_index,
            candidate: None,
            retry_count: 0,
        }
    }

    pub fn detail(candidate: CandidateRecord) -> Self {
        Self {
            url: candidate.url.clone(),
            unique_key: format!("DETAIL:{}", candidate.id),
            label: PageLabel::Detail,
            page_index: 0,
            candidate: Some(candidate),
            retry_count: 0,
        }
    }
}

/// Raw response handed to a [`PageHandler`].
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub body: String,
}

/// Fetches pages on behalf of a session.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &CrawlRequest, session: &Session)
        -> Result<FetchedPage, PageError>;

    /// Forget per-session state once the pool retires a session.
    async fn release_session(&self, _session: &Session) {}
}

/// Processes one fetched page.
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn handle(&self, request: &CrawlRequest, page: FetchedPage) -> Result<(), PageError>;
}
