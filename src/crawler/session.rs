//! Session pool.
//!
//! A session is a crawl identity: user agent, cookie jar and proxy. The
//! fetcher keys its per-session state (cookies) by [`Session::id`], so a
//! retired session's replacement always starts clean.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::scrapers::user_agent_for;

/// Errors after which a session is retired.
pub const MAX_SESSION_ERRORS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: u64,
    pub user_agent: String,
    pub proxy: Option<String>,
}

#[derive(Debug)]
struct SessionSlot {
    session: Session,
    error_count: u32,
}

#[derive(Debug, Default)]
struct PoolState {
    slots: Vec<SessionSlot>,
    cursor: usize,
    next_id: u64,
}

/// Round-robin pool of up to `max_sessions` live sessions.
#[derive(Debug, Clone)]
pub struct SessionPool {
    max_sessions: usize,
    proxies: Arc<Vec<String>>,
    state: Arc<Mutex<PoolState>>,
}

impl SessionPool {
    pub fn new(max_sessions: usize, proxies: Vec<String>) -> Self {
        Self {
            max_sessions: max_sessions.max(1),
            proxies: Arc::new(proxies),
            state: Arc::new(Mutex::new(PoolState::default())),
        }
    }

    /// Hand out a session, creating one while the pool is below capacity.
    pub async fn acquire(&self) -> Session {
        let mut state = self.state.lock().await;

        if state.slots.len() < self.max_sessions {
            let session = self.new_session(state.next_id);
            state.next_id += 1;
            debug!("Created session {} ({})", session.id, session.user_agent);
            state.slots.push(SessionSlot {
                session: session.clone(),
                error_count: 0,
            });
            return session;
        }

        let index = state.cursor % state.slots.len();
        state.cursor = state.cursor.wrapping_add(1);
        state.slots[index].session.clone()
    }

    fn new_session(&self, id: u64) -> Session {
        let proxy = if self.proxies.is_empty() {
            None
        } else {
            Some(self.proxies[id as usize % self.proxies.len()].clone())
        };
        Session {
            id,
            user_agent: user_agent_for(id as usize).to_string(),
            proxy,
        }
    }

    /// A request on this session succeeded.
    pub async fn mark_good(&self, session_id: u64) {
        let mut state = self.state.lock().await;
        if let Some(slot) = state.slots.iter_mut().find(|s| s.session.id == session_id) {
            slot.error_count = slot.error_count.saturating_sub(1);
        }
    }

    /// Record an error. Returns true when the session got retired.
    pub async fn mark_bad(&self, session_id: u64) -> bool {
        let mut state = self.state.lock().await;
        let Some(pos) = state.slots.iter().position(|s| s.session.id == session_id) else {
            return false;
        };
        state.slots[pos].error_count += 1;
        if state.slots[pos].error_count >= MAX_SESSION_ERRORS {
            state.slots.remove(pos);
            info!("Retired session {} after {} errors", session_id, MAX_SESSION_ERRORS);
            return true;
        }
        false
    }

    /// Drop a session immediately. Returns false if it was already gone.
    pub async fn retire(&self, session_id: u64) -> bool {
        let mut state = self.state.lock().await;
        let before = state.slots.len();
        state.slots.retain(|s| s.session.id != session_id);
        let removed = state.slots.len() < before;
        if removed {
            info!("Retired session {}", session_id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_grows_then_rotates() {
        let pool = SessionPool::new(2, Vec::new());
        let a = pool.acquire().await;
        let b = pool.acquire().await;
        assert_ne!(a.id, b.id);
        assert_ne!(a.user_agent, b.user_agent);

        let c = pool.acquire().await;
        let d = pool.acquire().await;
        assert_eq!(c.id, a.id);
        assert_eq!(d.id, b.id);
        assert_eq!(pool.state.lock().await.slots.len(), 2);
    }

    #[tokio::test]
    async fn test_mark_bad_retires_after_threshold() {
        let pool = SessionPool::new(1, Vec::new());
        let session = pool.acquire().await;
        assert!(!pool.mark_bad(session.id).await);
        assert!(!pool.mark_bad(session.id).await);
        assert!(pool.mark_bad(session.id).await);
        assert!(pool.state.lock().await.slots.is_empty());

        let fresh = pool.acquire().await;
        assert_ne!(fresh.id, session.id);
    }

    #[tokio::test]
    async fn test_retire_replaces_identity_and_rotates_proxy() {
        let pool = SessionPool::new(
            1,
            vec!["http://proxy-a:8000".into(), "http://proxy-b:8000".into()],
        );
        let first = pool.acquire().await;
        assert_eq!(first.proxy.as_deref(), Some("http://proxy-a:8000"));

        assert!(pool.retire(first.id).await);
        assert!(!pool.retire(first.id).await);

        let second = pool.acquire().await;
        assert_eq!(second.proxy.as_deref(), Some("http://proxy-b:8000"));
        assert_ne!(second.user_agent, first.user_agent);
    }
}
