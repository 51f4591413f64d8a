//! Per-origin request throttling.
//!
//! Counts requests per origin key inside a fixed window that restarts once it
//! has elapsed. Independent of which account is targeted, and independent of
//! per-account lockout.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::services::lockout::seconds;

#[derive(Debug, Clone)]
struct Bucket {
    count: u32,
    window_start: DateTime<Utc>,
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests: config.max_requests,
            window: seconds(config.window_seconds),
            clock,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the request is allowed.
    ///
    /// A denied request does not increment the counter.
    pub async fn check(&self, origin: &str) -> bool {
        let now = self.clock.now();
        let mut buckets = self.buckets.lock().await;

        let Some(bucket) = buckets.get_mut(origin) else {
            buckets.insert(
                origin.to_string(),
                Bucket {
                    count: 1,
                    window_start: now,
                },
            );
            return true;
        };

        if now - bucket.window_start > self.window {
            *bucket = Bucket {
                count: 1,
                window_start: now,
            };
            return true;
        }

        if bucket.count >= self.max_requests {
            return false;
        }

        bucket.count += 1;
        true
    }

    /// Requests counted for an origin in its current window.
    pub async fn count(&self, origin: &str) -> u32 {
        let now = self.clock.now();
        self.buckets
            .lock()
            .await
            .get(origin)
            .filter(|b| now - b.window_start <= self.window)
            .map_or(0, |b| b.count)
    }

    /// Drops buckets whose window has elapsed. Returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| now - bucket.window_start <= self.window);
        before - buckets.len()
    }

    pub async fn tracked_origins_count(&self) -> usize {
        self.buckets.lock().await.len()
    }
}
