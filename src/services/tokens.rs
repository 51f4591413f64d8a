//! Opaque session tokens.
//!
//! Token values are 256 random bits, hex encoded, and mean nothing without the
//! server-side table. A value is never handed out twice, so once revoked or
//! expired it can never validate again.

use chrono::{DateTime, Duration};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::config::TokenConfig;
use crate::constants::tokens::TOKEN_BYTES;
use crate::models::{AccountId, SessionToken};
use crate::services::lockout::seconds;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Absent, revoked or expired. Callers must not distinguish these.
    #[error("Invalid or expired token")]
    Invalid,
}

pub struct TokenManager {
    ttl: Duration,
    refresh_threshold: Duration,
    clock: Arc<dyn Clock>,
    tokens: Mutex<HashMap<String, SessionToken>>,
}

impl TokenManager {
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: seconds(config.ttl_seconds),
            refresh_threshold: seconds(config.refresh_threshold_seconds),
            clock,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub async fn issue(&self, account_id: AccountId) -> SessionToken {
        let mut tokens = self.tokens.lock().await;
        self.issue_locked(&mut tokens, account_id)
    }

    /// Idempotent: unknown and already-revoked values are a no-op.
    /// Returns the token as it was before this call, if it was still active.
    pub async fn revoke(&self, value: &str) -> Option<SessionToken> {
        let now = self.clock.now();
        let mut tokens = self.tokens.lock().await;
        let token = tokens.get_mut(value)?;
        let was_active = token.is_active(now);
        let before = token.clone();
        token.revoked = true;
        was_active.then_some(before)
    }

    pub async fn validate(&self, value: &str) -> Result<AccountId, TokenError> {
        self.get(value).await.map(|t| t.account_id)
    }

    /// Returns the full active token record.
    pub async fn get(&self, value: &str) -> Result<SessionToken, TokenError> {
        let now = self.clock.now();
        self.tokens
            .lock()
            .await
            .get(value)
            .filter(|t| t.is_active(now))
            .cloned()
            .ok_or(TokenError::Invalid)
    }

    /// Revokes `old` and issues a replacement for the same account under one
    /// lock, so the two values are never valid at the same time.
    pub async fn rotate(&self, old: &str) -> Result<SessionToken, TokenError> {
        let now = self.clock.now();
        let mut tokens = self.tokens.lock().await;

        let account_id = match tokens.get_mut(old) {
            Some(token) if token.is_active(now) => {
                token.revoked = true;
                token.account_id
            }
            _ => return Err(TokenError::Invalid),
        };

        Ok(self.issue_locked(&mut tokens, account_id))
    }

    /// True once less than the refresh threshold remains.
    #[must_use]
    pub fn is_refresh_due(&self, token: &SessionToken) -> bool {
        token.remaining(self.clock.now()) < self.refresh_threshold
    }

    /// Removes tokens past expiry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, t| now < t.expires_at);
        before - tokens.len()
    }

    pub async fn active_count(&self) -> usize {
        let now = self.clock.now();
        self.tokens
            .lock()
            .await
            .values()
            .filter(|t| t.is_active(now))
            .count()
    }

    fn issue_locked(
        &self,
        tokens: &mut HashMap<String, SessionToken>,
        account_id: AccountId,
    ) -> SessionToken {
        let issued_at = self.clock.now();
        let mut value = generate_token_value();
        while tokens.contains_key(&value) {
            value = generate_token_value();
        }

        let token = SessionToken {
            value: value.clone(),
            account_id,
            issued_at,
            expires_at: expiry(issued_at, self.ttl),
            revoked: false,
        };
        tokens.insert(value, token.clone());
        token
    }
}

fn expiry(issued_at: DateTime<chrono::Utc>, ttl: Duration) -> DateTime<chrono::Utc> {
    let ttl = ttl.max(Duration::seconds(1));
    issued_at
        .checked_add_signed(ttl)
        .unwrap_or(DateTime::<chrono::Utc>::MAX_UTC)
}

/// Generate a random token value (64 character hex string)
#[must_use]
pub fn generate_token_value() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_BYTES] = rng.random();

    hex::encode(bytes)
}
