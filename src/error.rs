//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why processing a single page failed.
#[derive(Debug, Error)]
pub enum PageError {
    /// The page is gone; drop it and move on.
    #[error("HTTP {status}: page not found")]
    NotFound { status: u16 },

    /// Anti-bot response, rate limit or a page without doctor content.
    #[error("blocked: {reason}")]
    Blocked { reason: String },

    #[error("request handler timed out")]
    Timeout,

    /// Transport-level failure (DNS, TLS, connection reset, body decode).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The record sink rejected a write.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl PageError {
    /// Whether the engine should put the request back on the queue.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PageError::Blocked { .. } | PageError::Timeout | PageError::Fetch(_)
        )
    }

    /// Whether the whole run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PageError::Output(_))
    }

    /// Whether the session that served the request should be retired at once.
    pub fn burns_session(&self) -> bool {
        matches!(self, PageError::Blocked { .. })
    }
}

impl From<reqwest::Error> for PageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PageError::Timeout
        } else {
            PageError::Fetch(e.to_string())
        }
    }
}

/// Errors raised while loading the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid proxy URL {url}: {reason}")]
    InvalidProxyUrl { url: String, reason: String },

    #[error("invalid start URL {url}: {source}")]
    InvalidStartUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Errors that end a whole crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error("failed to flush output: {0}")]
    Flush(#[source] std::io::Error),
}
