//! Fixed-window request limiting per client key.
//!
//! Each key gets a counter that resets when its window elapses. The counter
//! lives behind `RateLimitStore` so a shared store can replace the in-memory
//! map without touching the middleware.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Message for the global `/api` limiter.
pub const GLOBAL_LIMIT_MESSAGE: &str = "Muitas requisições deste IP, tente novamente mais tarde.";

/// Message for the webhook limiter.
pub const WEBHOOK_LIMIT_MESSAGE: &str = "Limite de webhooks excedido";

/// Tracked keys above which expired windows are swept on insert.
const SWEEP_THRESHOLD: usize = 10_000;

/// Counter state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u32,
    pub reset_at: Instant,
}

pub trait RateLimitStore: Send + Sync {
    /// Count one hit for `key` and return the window it landed in.
    fn hit(&self, key: &str, window: Duration, now: Instant) -> WindowCount;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    windows: Mutex<HashMap<String, WindowCount>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryStore {
    fn hit(&self, key: &str, window: Duration, now: Instant) -> WindowCount {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        if windows.len() >= SWEEP_THRESHOLD && !windows.contains_key(key) {
            let before = windows.len();
            windows.retain(|_, w| w.reset_at > now);
            debug!(before = before, after = windows.len(), "rate_limit_swept");
        }

        let entry = windows.entry(key.to_string()).or_insert(WindowCount {
            count: 0,
            reset_at: now + window,
        });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + window;
        }
        entry.count = entry.count.saturating_add(1);
        *entry
    }
}

/// Result of a limit check, with what the `RateLimit-*` headers report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Whole seconds until the window resets (rounded up).
    pub reset_secs: u64,
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    window: Duration,
    max_requests: u32,
    message: &'static str,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32, message: &'static str) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), window, max_requests, message)
    }

    pub fn with_store(
        store: Arc<dyn RateLimitStore>,
        window: Duration,
        max_requests: u32,
        message: &'static str,
    ) -> Self {
        Self {
            store,
            window,
            max_requests,
            message,
        }
    }

    /// Body text returned with a 429.
    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn check(&self, key: &str) -> RateLimitStatus {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitStatus {
        let window = self.store.hit(key, self.window, now);
        let allowed = window.count <= self.max_requests;
        let until_reset = window.reset_at.saturating_duration_since(now);
        let reset_secs = until_reset.as_secs() + u64::from(until_reset.subsec_nanos() > 0);

        if !allowed {
            warn!(
                key = key,
                count = window.count,
                max = self.max_requests,
                "rate_limit_exceeded"
            );
        }

        RateLimitStatus {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            reset_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> RateLimiter {
        RateLimiter::new(Duration::from_secs(60), max, WEBHOOK_LIMIT_MESSAGE)
    }

    #[test]
    fn test_rejects_request_over_max() {
        let limiter = limiter(3);
        let now = Instant::now();

        for expected_remaining in [2, 1, 0] {
            let status = limiter.check_at("10.0.0.1", now);
            assert!(status.allowed);
            assert_eq!(status.remaining, expected_remaining);
        }

        let status = limiter.check_at("10.0.0.1", now);
        assert!(!status.allowed);
        assert_eq!(status.remaining, 0);
        assert_eq!(status.limit, 3);
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(1);
        let now = Instant::now();

        assert!(limiter.check_at("k", now).allowed);
        assert!(!limiter.check_at("k", now + Duration::from_secs(30)).allowed);
        assert!(limiter.check_at("k", now + Duration::from_secs(60)).allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1);
        let now = Instant::now();

        assert!(limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
        assert!(!limiter.check_at("a", now).allowed);
    }

    #[test]
    fn test_reset_secs_rounds_up() {
        let limiter = limiter(5);
        let now = Instant::now();

        limiter.check_at("k", now);
        let status = limiter.check_at("k", now + Duration::from_millis(500));
        assert_eq!(status.reset_secs, 60);
    }

    #[test]
    fn test_store_survives_poison() {
        let store = Arc::new(InMemoryStore::new());
        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.windows.lock().unwrap();
            panic!("poison");
        })
        .join();

        let window = store.hit("k", Duration::from_secs(1), Instant::now());
        assert_eq!(window.count, 1);
    }
}
