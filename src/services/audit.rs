//! Append-only audit log.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AuditConfig;
use crate::constants;
use crate::models::{AuditEntry, AuditPage, NewAuditEntry};
use crate::services::rate_limit::RateLimiter;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit log is full ({0} entries)")]
    CapacityExceeded(usize),
}

pub struct AuditLog {
    max_entries: usize,
    /// Size past which unattributed entries are dropped instead of stored.
    unattributed_ceiling: usize,
    unattributed: RateLimiter,
    clock: Arc<dyn Clock>,
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new(config: &AuditConfig, clock: Arc<dyn Clock>) -> Self {
        let reserve = config.max_entries / constants::audit::RESERVE_DIVISOR;
        Self {
            max_entries: config.max_entries,
            unattributed_ceiling: config.max_entries - reserve,
            unattributed: RateLimiter::new(&config.unattributed_rate_limit, clock.clone()),
            clock,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Appends an entry with a fresh id and the current time.
    ///
    /// Callers must treat an error as fatal to the operation being audited.
    pub async fn record(&self, entry: NewAuditEntry) -> Result<AuditEntry, AuditError> {
        self.append(entry, self.max_entries).await.map_err(|entry| {
            warn!(
                action = entry.action.as_str(),
                capacity = self.max_entries,
                "Audit log full, refusing entry"
            );
            AuditError::CapacityExceeded(self.max_entries)
        })
    }

    /// Appends an entry no account can be held to, such as a rejected bearer
    /// token. Throttled per origin and kept out of the reserved tail of the
    /// log. Returns `None` when the entry was dropped.
    pub async fn record_unattributed(&self, entry: NewAuditEntry) -> Option<AuditEntry> {
        if !self.unattributed.check(&entry.origin).await {
            dropped(&entry, "origin_throttled");
            return None;
        }

        match self.append(entry, self.unattributed_ceiling).await {
            Ok(entry) => Some(entry),
            Err(entry) => {
                dropped(&entry, "reserve");
                None
            }
        }
    }

    /// Drops elapsed throttle buckets. Returns how many were removed.
    pub async fn sweep_throttle(&self) -> usize {
        self.unattributed.cleanup().await
    }

    /// Hands the entry back if the log already holds `limit` entries.
    async fn append(
        &self,
        entry: NewAuditEntry,
        limit: usize,
    ) -> Result<AuditEntry, NewAuditEntry> {
        let mut entries = self.entries.write().await;
        if entries.len() >= limit {
            return Err(entry);
        }

        let entry = AuditEntry {
            id: Uuid::new_v4(),
            account_id: entry.account_id,
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            timestamp: self.clock.now(),
            origin: entry.origin,
            agent: entry.agent,
            success: entry.success,
            details: entry.details,
        };

        info!(
            target: "audit",
            id = %entry.id,
            account_id = entry.account_id,
            action = entry.action.as_str(),
            resource_id = %entry.resource_id,
            origin = %entry.origin,
            success = entry.success,
            details = entry.details.as_deref(),
            "audit"
        );

        entries.push(entry.clone());
        Ok(entry)
    }

    /// Returns one page, newest first. `page` and `limit` are 1-based and
    /// clamped to at least 1. The whole query runs against one snapshot.
    pub async fn query(&self, page: usize, limit: usize) -> AuditPage {
        let page = page.max(1);
        let limit = limit.max(1);

        let entries = self.entries.read().await;
        let total = entries.len();

        // Append order breaks timestamp ties: later appends rank first.
        let mut ranked: Vec<(usize, &AuditEntry)> = entries.iter().enumerate().collect();
        ranked.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));

        let offset = (page - 1).saturating_mul(limit);
        let page_entries = ranked
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect();

        AuditPage {
            entries: page_entries,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn dropped(entry: &NewAuditEntry, reason: &'static str) {
    debug!(
        action = entry.action.as_str(),
        origin = %entry.origin,
        reason,
        "Unattributed audit entry dropped"
    );
    metrics::counter!("audit_entries_dropped_total", "reason" => reason).increment(1);
}
