use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

use super::account::{AccountId, Role};

/// Server-held session token. The value is the only thing a client ever sees.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub value: String,
    pub account_id: AccountId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl SessionToken {
    /// Active means present, not revoked and `now < expires_at`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }

    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.value.chars().take(6).collect();
        f.debug_struct("SessionToken")
            .field("value", &format_args!("{prefix}…"))
            .field("account_id", &self.account_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("revoked", &self.revoked)
            .finish()
    }
}

/// Identity resolved from a valid token. Only the authorization guard
/// constructs one, so holding a `Principal` proves the token was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    account_id: AccountId,
    role: Role,
}

impl Principal {
    pub(crate) const fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }

    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.account_id
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
