//! Fixed-window request counter for the public endpoints.
//!
//! Counters live in this process only, so several server instances each
//! enforce their own budget.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use moka::future::Cache;

use super::config::RateLimitConfig;

const MAX_TRACKED_CLIENTS: u64 = 100_000;

#[derive(Clone)]
pub struct RateLimiter {
    windows: Cache<String, Arc<AtomicU32>>,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let windows = Cache::builder()
            .max_capacity(MAX_TRACKED_CLIENTS)
            .time_to_live(Duration::from_secs(config.window_secs))
            .build();
        Self {
            windows,
            max_requests: config.max_requests,
        }
    }

    /// Count a request for `key`; `false` once the window's budget is spent.
    /// The window starts at the key's first request.
    pub async fn check(&self, key: &str) -> bool {
        let counter = self
            .windows
            .get_with(key.to_string(), async { Arc::new(AtomicU32::new(0)) })
            .await;
        counter.fetch_add(1, Ordering::SeqCst) < self.max_requests
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("tracked_clients", &self.windows.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn budget_is_per_key() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 2,
            window_secs: 60,
        });
        assert!(limiter.check("203.0.113.7").await);
        assert!(limiter.check("203.0.113.7").await);
        assert!(!limiter.check("203.0.113.7").await);
        assert!(limiter.check("198.51.100.2").await);
    }

    #[tokio::test]
    async fn window_expires() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window_secs: 1,
        });
        assert!(limiter.check("unknown").await);
        assert!(!limiter.check("unknown").await);
        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert!(limiter.check("unknown").await);
    }
}
