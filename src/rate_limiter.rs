//! Keyed fixed-window rate limiter for the checkout endpoints.
//!
//! Deliberately an explicit value held in application state and passed to
//! handlers, not a process-global: tests swap in their own instance with
//! a tight window and production wiring uses one per concern.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::errors::ServiceError;

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitEntry {
    fn new() -> Self {
        Self {
            count: 1,
            window_start: Instant::now(),
        }
    }

    fn increment(&mut self, window_duration: Duration) {
        let now = Instant::now();

        // Reset if window has expired
        if now.duration_since(self.window_start) >= window_duration {
            self.count = 1;
            self.window_start = now;
        } else {
            self.count += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 30,
            window_duration: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, RateLimitEntry>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Records a request against `key` and rejects it once the key has
    /// exceeded its budget for the current window.
    pub fn check(&self, key: &str) -> Result<(), ServiceError> {
        use dashmap::mapref::entry::Entry;

        let count = match self.entries.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateLimitEntry::new());
                1
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().increment(self.config.window_duration);
                entry.get().count
            }
        };

        if count > self.config.requests_per_window {
            debug!(key, count, "rate limit exceeded");
            return Err(ServiceError::RateLimitExceeded);
        }

        Ok(())
    }
}
