use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type AccountId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account record as held by the credential store.
#[derive(Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub failed_attempts: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_origin: Option<String>,
    pub last_agent: Option<String>,
}

impl Account {
    #[must_use]
    pub fn new(
        id: AccountId,
        username: impl Into<String>,
        password_hash: String,
        role: Role,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            password_hash,
            role,
            is_active: true,
            failed_attempts: 0,
            last_failure_at: None,
            last_login_at: None,
            last_origin: None,
            last_agent: None,
        }
    }

    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("failed_attempts", &self.failed_attempts)
            .field("last_failure_at", &self.last_failure_at)
            .field("last_login_at", &self.last_login_at)
            .finish_non_exhaustive()
    }
}
