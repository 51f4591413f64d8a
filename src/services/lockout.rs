//! Per-account brute-force lockout.
//!
//! Independent of origin throttling: an account locks once it has collected
//! `max_failures` failures and stays locked until `cooldown` has elapsed since
//! the most recent one. The check runs before the password is verified, so a
//! correct password does not unlock an account early.

use chrono::{DateTime, Duration, Utc};

use crate::config::LockoutConfig;
use crate::models::Account;

#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    max_failures: u32,
    cooldown: Duration,
}

impl LockoutPolicy {
    #[must_use]
    pub fn new(config: &LockoutConfig) -> Self {
        Self {
            max_failures: config.max_failures,
            cooldown: seconds(config.cooldown_seconds),
        }
    }

    #[must_use]
    pub fn may_attempt(&self, account: &Account, now: DateTime<Utc>) -> bool {
        !self.is_locked(account, now)
    }

    #[must_use]
    pub fn is_locked(&self, account: &Account, now: DateTime<Utc>) -> bool {
        if account.failed_attempts < self.max_failures {
            return false;
        }

        account
            .last_failure_at
            .is_some_and(|last| now - last < self.cooldown)
    }

    pub fn record_failure(&self, account: &mut Account, now: DateTime<Utc>) {
        account.failed_attempts = account.failed_attempts.saturating_add(1);
        account.last_failure_at = Some(now);
    }

    pub fn record_success(&self, account: &mut Account, now: DateTime<Utc>) {
        account.failed_attempts = 0;
        account.last_login_at = Some(now);
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(&LockoutConfig::default())
    }
}

pub(crate) fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn account() -> Account {
        Account::new(1, "alice", String::new(), Role::User)
    }

    #[test]
    fn test_fresh_account_may_attempt() {
        let policy = LockoutPolicy::default();
        assert!(policy.may_attempt(&account(), Utc::now()));
    }

    #[test]
    fn test_locks_after_five_failures() {
        let policy = LockoutPolicy::default();
        let mut account = account();
        let now = Utc::now();

        for i in 0..4 {
            policy.record_failure(&mut account, now + Duration::seconds(i));
            assert!(policy.may_attempt(&account, now + Duration::seconds(i)));
        }

        policy.record_failure(&mut account, now + Duration::seconds(10));
        assert_eq!(account.failed_attempts, 5);
        assert!(!policy.may_attempt(&account, now + Duration::seconds(11)));
        assert!(policy.is_locked(&account, now + Duration::seconds(11)));
    }

    #[test]
    fn test_lock_lifts_after_cooldown_from_last_failure() {
        let policy = LockoutPolicy::default();
        let mut account = account();
        let start = Utc::now();

        for _ in 0..5 {
            policy.record_failure(&mut account, start);
        }

        assert!(!policy.may_attempt(&account, start + Duration::minutes(4)));
        assert!(!policy.may_attempt(&account, start + Duration::seconds(299)));
        assert!(policy.may_attempt(&account, start + Duration::minutes(5)));
    }

    #[test]
    fn test_success_resets_counter() {
        let policy = LockoutPolicy::default();
        let mut account = account();
        let now = Utc::now();

        policy.record_failure(&mut account, now);
        policy.record_failure(&mut account, now);
        policy.record_success(&mut account, now);

        assert_eq!(account.failed_attempts, 0);
        assert_eq!(account.last_login_at, Some(now));
    }

    #[test]
    fn test_failure_after_cooldown_relocks_immediately() {
        let policy = LockoutPolicy::default();
        let mut account = account();
        let start = Utc::now();

        for _ in 0..5 {
            policy.record_failure(&mut account, start);
        }

        let later = start + Duration::minutes(6);
        assert!(policy.may_attempt(&account, later));

        // The counter only resets on success, so one more miss locks again.
        policy.record_failure(&mut account, later);
        assert!(!policy.may_attempt(&account, later));
    }
}
