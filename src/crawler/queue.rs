//! In-memory request queue with at-most-once enqueue.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::CrawlRequest;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<CrawlRequest>,
    seen_keys: HashSet<String>,
    in_progress: usize,
}

/// FIFO of pending requests shared between workers and the page handler.
///
/// A request's `unique_key` is remembered forever, so re-adding the same
/// listing URL or detail id is a no-op. Retries go through
/// [`reclaim`](Self::reclaim), which bypasses the key check.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    state: Arc<Mutex<QueueState>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue unless the key was seen before. Returns whether it was added.
    pub async fn add(&self, request: CrawlRequest) -> bool {
        let mut state = self.state.lock().await;
        if !state.seen_keys.insert(request.unique_key.clone()) {
            return false;
        }
        state.pending.push_back(request);
        true
    }

    /// Take the next request and mark it in progress.
    pub async fn fetch_next(&self) -> Option<CrawlRequest> {
        let mut state = self.state.lock().await;
        let request = state.pending.pop_front()?;
        state.in_progress += 1;
        Some(request)
    }

    /// Put an in-progress request back for another attempt.
    pub async fn reclaim(&self, mut request: CrawlRequest) {
        let mut state = self.state.lock().await;
        state.in_progress = state.in_progress.saturating_sub(1);
        request.retry_count += 1;
        state.pending.push_back(request);
    }

    /// Finish an in-progress request, successfully or not.
    pub async fn mark_handled(&self) {
        let mut state = self.state.lock().await;
        state.in_progress = state.in_progress.saturating_sub(1);
    }

    /// Nothing pending and nothing in flight.
    pub async fn is_finished(&self) -> bool {
        let state = self.state.lock().await;
        state.pending.is_empty() && state.in_progress == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_ignores_repeated_keys() {
        let queue = RequestQueue::new();
        assert!(queue.add(CrawlRequest::listing("https://oladoc.com/a", 1)).await);
        assert!(!queue.add(CrawlRequest::listing("https://oladoc.com/a", 2)).await);
        assert!(queue.add(CrawlRequest::listing("https://oladoc.com/b", 2)).await);
        assert_eq!(queue.state.lock().await.pending.len(), 2);
    }

    #[tokio::test]
    async fn test_fifo_and_completion() {
        let queue = RequestQueue::new();
        queue.add(CrawlRequest::listing("https://oladoc.com/a", 1)).await;
        queue.add(CrawlRequest::listing("https://oladoc.com/b", 2)).await;

        let first = queue.fetch_next().await.unwrap();
        assert_eq!(first.url, "https://oladoc.com/a");
        let second = queue.fetch_next().await.unwrap();
        assert_eq!(second.url, "https://oladoc.com/b");
        assert!(queue.fetch_next().await.is_none());
        assert!(!queue.is_finished().await);

        queue.mark_handled().await;
        queue.mark_handled().await;
        assert!(queue.is_finished().await);
    }

    #[tokio::test]
    async fn test_reclaim_requeues_with_retry_count() {
        let queue = RequestQueue::new();
        queue.add(CrawlRequest::listing("https://oladoc.com/a", 1)).await;
        let request = queue.fetch_next().await.unwrap();
        queue.reclaim(request).await;

        let retried = queue.fetch_next().await.unwrap();
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.url, "https://oladoc.com/a");
    }
}
