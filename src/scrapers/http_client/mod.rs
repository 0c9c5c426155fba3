//! HTTP client that fetches pages as a browser-like session.

mod user_agent;

pub use user_agent::{user_agent_for, IMPERSONATE_USER_AGENTS};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::debug;

use super::rate_limiter::RateLimiter;
use crate::crawler::{CrawlRequest, FetchedPage, PageFetcher, Session};
use crate::error::PageError;

/// Headers every request carries besides the session's user agent.
pub const DEFAULT_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
    ("upgrade-insecure-requests", "1"),
];

fn default_header_map() -> HeaderMap {
    DEFAULT_HEADERS
        .iter()
        .map(|&(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value)))
        .collect()
}

/// Page fetcher with one cookie jar per crawl session and a shared
/// per-domain rate limiter.
#[derive(Clone)]
pub struct HttpClient {
    timeout: Duration,
    rate_limiter: RateLimiter,
    clients: Arc<Mutex<HashMap<u64, Client>>>,
}

impl HttpClient {
    pub fn new(timeout: Duration, rate_limiter: RateLimiter) -> Self {
        Self {
            timeout,
            rate_limiter,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn build_client(&self, session: &Session) -> Result<Client, PageError> {
        let mut builder = Client::builder()
            .user_agent(&session.user_agent)
            .default_headers(default_header_map())
            .cookie_store(true)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true);

        if let Some(proxy_url) = &session.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| PageError::Fetch(format!("invalid proxy {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| PageError::Fetch(format!("failed to create HTTP client: {}", e)))
    }

    async fn client_for(&self, session: &Session) -> Result<Client, PageError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&session.id) {
            return Ok(client.clone());
        }
        let client = self.build_client(session)?;
        clients.insert(session.id, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(
        &self,
        request: &CrawlRequest,
        session: &Session,
    ) -> Result<FetchedPage, PageError> {
        let client = self.client_for(session).await?;

        // Wait for rate limiter before making request
        let domain = self.rate_limiter.acquire(&request.url).await;

        let start = Instant::now();
        let response = client.get(&request.url).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        if let Some(ref domain) = domain {
            self.rate_limiter.report_status(domain, status).await;
        }

        let body = response.text().await?;
        debug!(
            "GET {} -> {} ({} bytes, {:?})",
            request.url,
            status,
            body.len(),
            start.elapsed()
        );

        Ok(FetchedPage {
            status,
            url: final_url,
            body,
        })
    }

    async fn release_session(&self, session: &Session) {
        self.clients.lock().await.remove(&session.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: u64, proxy: Option<&str>) -> Session {
        Session {
            id,
            user_agent: user_agent_for(id as usize).to_string(),
            proxy: proxy.map(str::to_string),
        }
    }

    #[test]
    fn test_default_headers_are_valid() {
        let headers = default_header_map();
        assert_eq!(headers.len(), DEFAULT_HEADERS.len());
        assert_eq!(headers.get("accept-language").unwrap(), "en-US,en;q=0.9");
    }

    #[tokio::test]
    async fn test_client_cached_per_session_and_released() {
        let http = HttpClient::new(Duration::from_secs(5), RateLimiter::new());
        let first = session(1, None);
        http.client_for(&first).await.unwrap();
        http.client_for(&first).await.unwrap();
        http.client_for(&session(2, None)).await.unwrap();
        assert_eq!(http.clients.lock().await.len(), 2);

        http.release_session(&first).await;
        assert_eq!(http.clients.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_proxied_session_gets_its_own_client() {
        let http = HttpClient::new(Duration::from_secs(5), RateLimiter::new());
        http.client_for(&session(1, Some("socks5h://proxy:1080")))
            .await
            .unwrap();
        http.client_for(&session(2, Some("http://proxy:8000")))
            .await
            .unwrap();
        assert_eq!(http.clients.lock().await.len(), 2);
    }
}
