//! Per-domain rate limiting state.

use std::time::{Duration, Instant};

/// State for a single domain.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Current spacing between request slots.
    pub current_delay: Duration,
    /// Earliest instant the next request may start.
    pub next_slot: Option<Instant>,
    /// Consecutive successes since the last rate limit.
    pub consecutive_successes: u32,
    pub in_backoff: bool,
    pub total_requests: u64,
    pub rate_limit_hits: u64,
}

impl DomainState {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            current_delay: base_delay,
            next_slot: None,
            consecutive_successes: 0,
            in_backoff: false,
            total_requests: 0,
            rate_limit_hits: 0,
        }
    }

    /// Reserve the next request slot and return when it starts.
    ///
    /// Slots are spaced `current_delay` apart, so concurrent callers queue
    /// behind each other instead of all firing once the domain is ready.
    pub fn reserve(&mut self, now: Instant) -> Instant {
        let slot = match self.next_slot {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next_slot = Some(slot + self.current_delay);
        self.total_requests += 1;
        slot
    }
}
