//! Background sweep of expired tokens and stale throttle buckets.
//!
//! Expiry is always checked lazily at the point of use; the sweep only keeps
//! the maps from growing without bound.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::services::{AuditLog, RateLimiter, TokenManager};

#[derive(Clone)]
pub struct Sweeper {
    tokens: Arc<TokenManager>,
    rate_limiter: Arc<RateLimiter>,
    audit: Arc<AuditLog>,
    interval: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_tokens: usize,
    pub stale_buckets: usize,
}

impl Sweeper {
    #[must_use]
    pub fn new(
        tokens: Arc<TokenManager>,
        rate_limiter: Arc<RateLimiter>,
        audit: Arc<AuditLog>,
        interval_seconds: u64,
    ) -> Self {
        Self {
            tokens,
            rate_limiter,
            audit,
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    pub async fn sweep_once(&self) -> SweepReport {
        let report = SweepReport {
            expired_tokens: self.tokens.purge_expired().await,
            stale_buckets: self.rate_limiter.cleanup().await + self.audit.sweep_throttle().await,
        };
        debug!(
            expired_tokens = report.expired_tokens,
            stale_buckets = report.stale_buckets,
            "Maintenance sweep finished"
        );
        report
    }

    /// Runs until the returned handle is aborted.
    #[must_use]
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            info!(interval_secs = self.interval.as_secs(), "Maintenance sweeper started");

            loop {
                interval.tick().await;
                self.sweep_once().await;
            }
        })
    }
}
