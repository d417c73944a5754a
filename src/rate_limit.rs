//! In-memory rate limiting for credential endpoints.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`,
//! keyed by normalized email. Two instances live in `AppState`:
//! - login attempts (default 10 per 5 minutes)
//! - password-reset emails (default 3 per 15 minutes)
//!
//! TRADE-OFFS
//! ==========
//! Counters are per-process and reset on restart. A successful login clears
//! its key. Keys whose window has drained are swept out whenever the map
//! reaches `SWEEP_THRESHOLD` entries, so unauthenticated callers cannot grow
//! it without bound.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::WindowLimit;

/// Map size at which drained keys are swept on the next attempt.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("too many attempts (max {limit} per {window_secs}s), try again later")]
    Exceeded { limit: usize, window_secs: u64 },
}

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    config: WindowLimit,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: WindowLimit) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), config }
    }

    /// Check the limit for `key`, then record the attempt.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Exceeded`] when the window is full; the
    /// rejected attempt is not recorded.
    pub fn check_and_record(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(key, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    fn check_and_record_at(&self, key: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;

        if inner.len() >= SWEEP_THRESHOLD {
            inner.retain(|_, deque| {
                prune_window(deque, now, cfg.window);
                !deque.is_empty()
            });
        }

        let deque = inner.entry(key.to_owned()).or_default();
        prune_window(deque, now, cfg.window);
        if deque.len() >= cfg.limit {
            return Err(RateLimitError::Exceeded { limit: cfg.limit, window_secs: cfg.window.as_secs() });
        }
        deque.push_back(now);
        Ok(())
    }

    /// Forget all attempts for `key`, e.g. after a successful login.
    pub fn reset(&self, key: &str) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.remove(key);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
