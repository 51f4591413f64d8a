//! In-memory credential store.
//!
//! Owns every [`Account`] record. Failure counters live on the record itself
//! and are only changed through [`LockoutPolicy`], so there is exactly one
//! counter per account. Login attempts on one account are serialised through
//! its attempt gate, so the lockout check, the password verification and the
//! counter update act as one step.

use anyhow::Context;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task;

use crate::config::{AccountSeed, SecurityConfig};
use crate::constants::limits::{MAX_SECRET_LEN, MAX_USERNAME_LEN};
use crate::models::{Account, AccountId, RequestContext};
use crate::services::lockout::LockoutPolicy;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Account id already exists: {0}")]
    DuplicateId(AccountId),

    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Password verification task failed: {0}")]
    Task(String),
}

#[derive(Default)]
struct Accounts {
    by_id: HashMap<AccountId, Account>,
    ids_by_username: HashMap<String, AccountId>,
    gates: HashMap<AccountId, Arc<Mutex<()>>>,
}

/// Held for the duration of one login attempt on an account.
pub type AttemptGuard = OwnedMutexGuard<()>;

pub struct CredentialStore {
    accounts: RwLock<Accounts>,
    lockout: LockoutPolicy,
    /// Verified against when the username is unknown so both paths cost the same.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(security: &SecurityConfig) -> Result<Self, StoreError> {
        let seed = crate::services::tokens::generate_token_value();
        let dummy_hash = hash_password(&seed, Some(security))
            .map_err(|e| StoreError::Hashing(e.to_string()))?;

        Ok(Self {
            accounts: RwLock::new(Accounts::default()),
            lockout: LockoutPolicy::new(&security.lockout),
            dummy_hash,
        })
    }

    /// Builds a store pre-populated with the configured seed accounts.
    pub async fn from_seeds(
        security: &SecurityConfig,
        seeds: &[AccountSeed],
    ) -> anyhow::Result<Self> {
        let store = Self::new(security)?;
        for seed in seeds {
            let mut account = Account::new(
                seed.id,
                seed.username.clone(),
                seed.password_hash.clone(),
                seed.role,
            );
            account.is_active = seed.active;
            store
                .insert(account)
                .await
                .with_context(|| format!("Failed to seed account '{}'", seed.username))?;
        }
        Ok(store)
    }

    #[must_use]
    pub const fn lockout(&self) -> &LockoutPolicy {
        &self.lockout
    }

    pub async fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;

        if accounts.ids_by_username.contains_key(&account.username) {
            return Err(StoreError::DuplicateUsername(account.username));
        }
        if accounts.by_id.contains_key(&account.id) {
            return Err(StoreError::DuplicateId(account.id));
        }

        accounts
            .ids_by_username
            .insert(account.username.clone(), account.id);
        accounts.gates.insert(account.id, Arc::new(Mutex::new(())));
        accounts.by_id.insert(account.id, account);
        Ok(())
    }

    pub async fn find_by_username(&self, username: &str) -> Option<Account> {
        let accounts = self.accounts.read().await;
        accounts
            .ids_by_username
            .get(username)
            .and_then(|id| accounts.by_id.get(id))
            .cloned()
    }

    pub async fn find_by_id(&self, id: AccountId) -> Option<Account> {
        self.accounts.read().await.by_id.get(&id).cloned()
    }

    /// Waits for the account's attempt gate and returns the record as it
    /// stands once the gate is held. Concurrent attempts on the same account
    /// queue here, so each one sees the counters left by the previous one.
    pub async fn begin_attempt(
        &self,
        id: AccountId,
    ) -> Result<(AttemptGuard, Account), StoreError> {
        let gate = self
            .accounts
            .read()
            .await
            .gates
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        let guard = gate.lock_owned().await;

        let account = self.find_by_id(id).await.ok_or(StoreError::NotFound(id))?;
        Ok((guard, account))
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Verifies a submitted secret against the account's Argon2 hash.
    ///
    /// Runs on the blocking pool; Argon2 is deliberately slow.
    pub async fn verify_password(
        &self,
        account: &Account,
        secret: &str,
    ) -> Result<bool, StoreError> {
        verify_blocking(account.password_hash.clone(), secret.to_string()).await
    }

    /// Burns the same work as a real verification for an unknown username.
    pub async fn verify_dummy(&self, secret: &str) -> Result<(), StoreError> {
        verify_blocking(self.dummy_hash.clone(), secret.to_string())
            .await
            .map(|_| ())
    }

    pub async fn apply_failure(
        &self,
        id: AccountId,
        now: DateTime<Utc>,
        ctx: &RequestContext,
    ) -> Result<Account, StoreError> {
        self.update(id, |account| {
            self.lockout.record_failure(account, now);
            stamp_caller(account, ctx);
        })
        .await
    }

    pub async fn apply_success(
        &self,
        id: AccountId,
        now: DateTime<Utc>,
        ctx: &RequestContext,
    ) -> Result<Account, StoreError> {
        self.update(id, |account| {
            self.lockout.record_success(account, now);
            stamp_caller(account, ctx);
        })
        .await
    }

    pub async fn set_active(&self, id: AccountId, active: bool) -> Result<Account, StoreError> {
        self.update(id, |account| account.is_active = active).await
    }

    async fn update(
        &self,
        id: AccountId,
        apply: impl FnOnce(&mut Account),
    ) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.by_id.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        apply(account);
        Ok(account.clone())
    }
}

fn stamp_caller(account: &mut Account, ctx: &RequestContext) {
    account.last_origin = Some(ctx.origin.clone());
    account.last_agent = Some(ctx.agent.clone());
}

async fn verify_blocking(password_hash: String, secret: String) -> Result<bool, StoreError> {
    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| StoreError::Hashing(format!("Invalid password hash format: {e}")))?;

        Ok(Argon2::default()
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok())
    })
    .await
    .map_err(|e| StoreError::Task(e.to_string()))?
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the crate's default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Usernames are 1..=64 chars of `[A-Za-z0-9_.-]`.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("Username is required");
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err("Username is too long");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err("Username contains invalid characters");
    }
    Ok(())
}

pub fn validate_secret(secret: &str) -> Result<(), &'static str> {
    if secret.is_empty() {
        return Err("Password is required");
    }
    if secret.len() > MAX_SECRET_LEN {
        return Err("Password is too long");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Role;

    pub(crate) fn fast_security() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 64,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        }
    }

    async fn store_with_alice() -> CredentialStore {
        let security = fast_security();
        let store = CredentialStore::new(&security).unwrap();
        let hash = hash_password("correct-secret", Some(&security)).unwrap();
        store
            .insert(Account::new(1, "alice", hash, Role::User))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_verify_password() {
        let store = store_with_alice().await;
        let alice = store.find_by_username("alice").await.unwrap();

        assert!(store.verify_password(&alice, "correct-secret").await.unwrap());
        assert!(!store.verify_password(&alice, "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn test_attempt_gate_sees_previous_attempt() {
        let store = Arc::new(store_with_alice().await);
        let ctx = RequestContext::default();
        let now = chrono::Utc::now();

        let (guard, before) = store.begin_attempt(1).await.unwrap();
        assert_eq!(before.failed_attempts, 0);

        let waiting = tokio::spawn({
            let store = store.clone();
            async move { store.begin_attempt(1).await.map(|(_, account)| account) }
        });
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        store.apply_failure(1, now, &ctx).await.unwrap();
        drop(guard);

        let after = waiting.await.unwrap().unwrap();
        assert_eq!(after.failed_attempts, 1);
        assert!(matches!(store.begin_attempt(9).await, Err(StoreError::NotFound(9))));
    }

    #[tokio::test]
    async fn test_hash_is_salted() {
        let security = fast_security();
        let a = hash_password("same", Some(&security)).unwrap();
        let b = hash_password("same", Some(&security)).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = store_with_alice().await;
        let err = store
            .insert(Account::new(2, "alice", String::new(), Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(_)));
    }

    #[tokio::test]
    async fn test_failure_and_success_share_one_counter() {
        let store = store_with_alice().await;
        let ctx = RequestContext::new("10.0.0.1", "test-agent");
        let now = Utc::now();

        store.apply_failure(1, now, &ctx).await.unwrap();
        let after = store.apply_failure(1, now, &ctx).await.unwrap();
        assert_eq!(after.failed_attempts, 2);
        assert_eq!(after.last_origin.as_deref(), Some("10.0.0.1"));

        let stored = store.find_by_username("alice").await.unwrap();
        assert_eq!(stored.failed_attempts, 2);

        let after = store.apply_success(1, now, &ctx).await.unwrap();
        assert_eq!(after.failed_attempts, 0);
        assert_eq!(store.find_by_id(1).await.unwrap().failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_update_unknown_account() {
        let store = store_with_alice().await;
        let err = store
            .apply_failure(42, Utc::now(), &RequestContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
    }

    #[tokio::test]
    async fn test_verify_dummy_succeeds() {
        let store = store_with_alice().await;
        assert!(store.verify_dummy("anything").await.is_ok());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a.b-c_d9").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username("alice'--").is_err());
        assert!(validate_username("ålice").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_secret() {
        assert!(validate_secret("x").is_ok());
        assert!(validate_secret("").is_err());
        assert!(validate_secret(&"x".repeat(1025)).is_err());
    }
}
