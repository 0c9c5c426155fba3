//! Rate limiter configuration and statistics.

use std::time::Duration;

/// Configuration for the adaptive rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Delay between request slots for the same domain.
    pub base_delay: Duration,
    /// Maximum delay (ceiling for backoff).
    pub max_delay: Duration,
    /// Multiplier applied on a rate-limit response.
    pub backoff_multiplier: f64,
    /// Multiplier applied on recovery (< 1.0 to decrease delay).
    pub recovery_multiplier: f64,
    /// Consecutive successes before the delay is reduced.
    pub recovery_threshold: u32,
}

impl RateLimitConfig {
    /// Spread `requests_per_minute` evenly over the minute.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        Self {
            base_delay: Duration::from_secs_f64(60.0 / rpm as f64),
            ..Default::default()
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(667),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            recovery_multiplier: 0.8,
            recovery_threshold: 5,
        }
    }
}

/// Statistics for a domain.
#[derive(Debug, Clone)]
pub struct DomainStats {
    pub current_delay: Duration,
    pub in_backoff: bool,
    pub total_requests: u64,
    pub rate_limit_hits: u64,
}
