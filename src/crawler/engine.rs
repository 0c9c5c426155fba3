//! Bounded worker pool that drains a [`RequestQueue`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::{CrawlRequest, PageFetcher, PageHandler, RequestQueue, Session, SessionPool};
use crate::error::PageError;

/// How long an idle worker waits before polling the queue again.
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_concurrency: usize,
    /// Retries after the first attempt before a request is abandoned.
    pub max_request_retries: u32,
    /// Wall-clock limit for fetching one page. Handlers always run to
    /// completion once a page has arrived.
    pub request_handler_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            max_request_retries: 5,
            request_handler_timeout: Duration::from_secs(90),
        }
    }
}

/// Counters for one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub succeeded: usize,
    pub retried: usize,
    /// Requests abandoned after exhausting retries or failing terminally.
    pub failed: usize,
}

#[derive(Default)]
struct Counters {
    succeeded: AtomicUsize,
    retried: AtomicUsize,
    failed: AtomicUsize,
}

/// Runs `max_concurrency` workers until the queue is drained.
pub struct CrawlEngine {
    config: EngineConfig,
    queue: RequestQueue,
    sessions: SessionPool,
    fetcher: Arc<dyn PageFetcher>,
    handler: Arc<dyn PageHandler>,
}

impl CrawlEngine {
    pub fn new(
        config: EngineConfig,
        queue: RequestQueue,
        sessions: SessionPool,
        fetcher: Arc<dyn PageFetcher>,
        handler: Arc<dyn PageHandler>,
    ) -> Self {
        Self {
            config,
            queue,
            sessions,
            fetcher,
            handler,
        }
    }

    /// Process requests until the queue is empty and no worker is busy.
    ///
    /// Returns the first fatal error, if any worker hit one.
    pub async fn run(&self) -> Result<EngineStats, PageError> {
        let workers = self.config.max_concurrency.max(1);
        let counters = Arc::new(Counters::default());
        let abort = Arc::new(AtomicBool::new(false));
        let fatal: Arc<Mutex<Option<PageError>>> = Arc::new(Mutex::new(None));

        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                config: self.config.clone(),
                queue: self.queue.clone(),
                sessions: self.sessions.clone(),
                fetcher: self.fetcher.clone(),
                handler: self.handler.clone(),
                counters: counters.clone(),
                abort: abort.clone(),
                fatal: fatal.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Crawl worker panicked: {}", e);
            }
        }

        if let Some(e) = fatal.lock().await.take() {
            return Err(e);
        }

        Ok(EngineStats {
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            retried: counters.retried.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        })
    }
}

struct Worker {
    id: usize,
    config: EngineConfig,
    queue: RequestQueue,
    sessions: SessionPool,
    fetcher: Arc<dyn PageFetcher>,
    handler: Arc<dyn PageHandler>,
    counters: Arc<Counters>,
    abort: Arc<AtomicBool>,
    fatal: Arc<Mutex<Option<PageError>>>,
}

impl Worker {
    async fn run(self) {
        loop {
            if self.abort.load(Ordering::Relaxed) {
                break;
            }

            let Some(request) = self.queue.fetch_next().await else {
                if self.queue.is_finished().await {
                    break;
                }
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            };

            let session = self.sessions.acquire().await;
            debug!(
                "Worker {} took {} {} (session {})",
                self.id, request.label, request.url, session.id
            );

            match self.process(&request, &session).await {
                Ok(()) => {
                    self.sessions.mark_good(session.id).await;
                    self.queue.mark_handled().await;
                    self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) if e.is_retryable() => self.retry_or_abandon(request, &session, e).await,
                Err(e) if e.is_fatal() => {
                    error!("Fatal error on {}: {}", request.url, e);
                    self.queue.mark_handled().await;
                    self.abort.store(true, Ordering::Relaxed);
                    let mut fatal = self.fatal.lock().await;
                    if fatal.is_none() {
                        *fatal = Some(e);
                    }
                    break;
                }
                Err(e) => {
                    warn!("Dropping {}: {}", request.url, e);
                    self.queue.mark_handled().await;
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    async fn process(&self, request: &CrawlRequest, session: &Session) -> Result<(), PageError> {
        let page = tokio::time::timeout(
            self.config.request_handler_timeout,
            self.fetcher.fetch(request, session),
        )
        .await
        .unwrap_or(Err(PageError::Timeout))?;
        self.handler.handle(request, page).await
    }

    async fn retry_or_abandon(&self, request: CrawlRequest, session: &Session, e: PageError) {
        let retired = if e.burns_session() {
            self.sessions.retire(session.id).await
        } else {
            self.sessions.mark_bad(session.id).await
        };
        if retired {
            self.fetcher.release_session(session).await;
        }

        if request.retry_count < self.config.max_request_retries {
            warn!(
                "{} {} failed (attempt {}): {}; retrying",
                request.label,
                request.url,
                request.retry_count + 1,
                e
            );
            self.queue.reclaim(request).await;
            self.counters.retried.fetch_add(1, Ordering::Relaxed);
        } else {
            warn!(
                "{} {} failed {} times, giving up: {}",
                request.label,
                request.url,
                request.retry_count + 1,
                e
            );
            self.queue.mark_handled().await;
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchedPage;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Serves canned statuses; URLs missing from the map time out.
    struct ScriptedFetcher {
        statuses: HashMap<String, u16>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(
            &self,
            request: &CrawlRequest,
            _session: &Session,
        ) -> Result<FetchedPage, PageError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match self.statuses.get(&request.url) {
                Some(&status) => Ok(FetchedPage {
                    status,
                    url: request.url.clone(),
                    body: String::new(),
                }),
                None => Err(PageError::Timeout),
            }
        }
    }

    /// Enqueues one follow-up from the first page; rejects 403s.
    struct FollowUpHandler {
        queue: RequestQueue,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageHandler for FollowUpHandler {
        async fn handle(&self, request: &CrawlRequest, page: FetchedPage) -> Result<(), PageError> {
            if page.status == 403 {
                return Err(PageError::Blocked {
                    reason: "HTTP 403".into(),
                });
            }
            self.seen.lock().await.push(request.url.clone());
            if request.page_index == 1 {
                self.queue
                    .add(CrawlRequest::listing("https://oladoc.com/next", 2))
                    .await;
            }
            Ok(())
        }
    }

    fn engine(
        statuses: &[(&str, u16)],
        retries: u32,
    ) -> (CrawlEngine, RequestQueue, Arc<ScriptedFetcher>, Arc<FollowUpHandler>) {
        let queue = RequestQueue::new();
        let fetcher = Arc::new(ScriptedFetcher {
            statuses: statuses
                .iter()
                .map(|(u, s)| (u.to_string(), *s))
                .collect(),
            calls: AtomicUsize::new(0),
        });
        let handler = Arc::new(FollowUpHandler {
            queue: queue.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let engine = CrawlEngine::new(
            EngineConfig {
                max_concurrency: 2,
                max_request_retries: retries,
                request_handler_timeout: Duration::from_secs(5),
            },
            queue.clone(),
            SessionPool::new(2, Vec::new()),
            fetcher.clone(),
            handler.clone(),
        );
        (engine, queue, fetcher, handler)
    }

    #[tokio::test]
    async fn test_drains_follow_up_requests() {
        let (engine, queue, _, handler) = engine(
            &[("https://oladoc.com/start", 200), ("https://oladoc.com/next", 200)],
            2,
        );
        queue
            .add(CrawlRequest::listing("https://oladoc.com/start", 1))
            .await;

        let stats = engine.run().await.unwrap();
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(
            *handler.seen.lock().await,
            vec!["https://oladoc.com/start", "https://oladoc.com/next"]
        );
        assert!(queue.is_finished().await);
    }

    #[tokio::test]
    async fn test_retries_then_abandons() {
        let (engine, queue, fetcher, _) = engine(&[("https://oladoc.com/blocked", 403)], 2);
        queue
            .add(CrawlRequest::listing("https://oladoc.com/blocked", 1))
            .await;

        let stats = engine.run().await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::Relaxed), 3);
        assert_eq!(stats.retried, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 0);
    }

    /// Answers 200 after a fixed delay.
    struct SlowFetcher {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for SlowFetcher {
        async fn fetch(
            &self,
            request: &CrawlRequest,
            _session: &Session,
        ) -> Result<FetchedPage, PageError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(self.delay).await;
            Ok(FetchedPage {
                status: 200,
                url: request.url.clone(),
                body: String::new(),
            })
        }
    }

    /// Sleeps before recording the page, like a handler waiting on a sink.
    struct SlowHandler {
        delay: Duration,
        finished: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageHandler for SlowHandler {
        async fn handle(&self, request: &CrawlRequest, _page: FetchedPage) -> Result<(), PageError> {
            tokio::time::sleep(self.delay).await;
            self.finished.lock().await.push(request.url.clone());
            Ok(())
        }
    }

    fn timed_engine(
        fetch_delay: Duration,
        handle_delay: Duration,
    ) -> (CrawlEngine, RequestQueue, Arc<SlowFetcher>, Arc<SlowHandler>) {
        let queue = RequestQueue::new();
        let fetcher = Arc::new(SlowFetcher {
            delay: fetch_delay,
            calls: AtomicUsize::new(0),
        });
        let handler = Arc::new(SlowHandler {
            delay: handle_delay,
            finished: Mutex::new(Vec::new()),
        });
        let engine = CrawlEngine::new(
            EngineConfig {
                max_concurrency: 1,
                max_request_retries: 1,
                request_handler_timeout: Duration::from_millis(50),
            },
            queue.clone(),
            SessionPool::new(1, Vec::new()),
            fetcher.clone(),
            handler.clone(),
        );
        (engine, queue, fetcher, handler)
    }

    #[tokio::test]
    async fn test_slow_handler_is_not_cancelled() {
        let (engine, queue, fetcher, handler) =
            timed_engine(Duration::ZERO, Duration::from_millis(150));
        queue
            .add(CrawlRequest::listing("https://oladoc.com/start", 1))
            .await;

        let stats = engine.run().await.unwrap();
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.retried, 0);
        assert_eq!(fetcher.calls.load(Ordering::Relaxed), 1);
        assert_eq!(*handler.finished.lock().await, vec!["https://oladoc.com/start"]);
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        let (engine, queue, fetcher, handler) =
            timed_engine(Duration::from_millis(200), Duration::ZERO);
        queue
            .add(CrawlRequest::listing("https://oladoc.com/slow", 1))
            .await;

        let stats = engine.run().await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::Relaxed), 2);
        assert_eq!(stats.retried, 1);
        assert_eq!(stats.failed, 1);
        assert!(handler.finished.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_retried() {
        let (engine, queue, fetcher, _) = engine(&[], 1);
        queue
            .add(CrawlRequest::listing("https://oladoc.com/slow", 1))
            .await;

        let stats = engine.run().await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::Relaxed), 2);
        assert_eq!(stats.failed, 1);
    }
}
