//! Domain service for authentication.
//!
//! Handles login, logout, token refresh and session introspection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::models::{AccountId, RequestContext, Role};
use crate::services::audit::AuditError;
use crate::services::credentials::StoreError;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Account temporarily locked")]
    AccountLocked,

    /// Unknown username or wrong secret. Deliberately one variant.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuditError> for AuthError {
    fn from(err: AuditError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Raw login input. Fields are `None` when missing or not a string.
#[derive(Clone, Default)]
pub struct LoginAttempt {
    pub username: Option<String>,
    pub secret: Option<String>,
}

impl LoginAttempt {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            secret: Some(secret.into()),
        }
    }
}

impl fmt::Debug for LoginAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAttempt")
            .field("username", &self.username)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Login result containing the account identity and a fresh session token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub account_id: AccountId,
    pub username: String,
    pub role: Role,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResult {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// False when `refresh_if_due` left the token alone.
    pub rotated: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub account_id: AccountId,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub refresh_due: bool,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and issues a session token.
    ///
    /// # Errors
    ///
    /// [`AuthError::RateLimited`] when the origin is throttled,
    /// [`AuthError::Validation`] for malformed input,
    /// [`AuthError::InvalidCredentials`] for an unknown user or wrong secret,
    /// [`AuthError::AccountDisabled`] and [`AuthError::AccountLocked`].
    async fn login(
        &self,
        attempt: LoginAttempt,
        ctx: &RequestContext,
    ) -> Result<LoginResult, AuthError>;

    /// Revokes the token. Always succeeds for unknown or dead tokens.
    async fn logout(&self, token: Option<&str>, ctx: &RequestContext) -> Result<(), AuthError>;

    /// Rotates the token unconditionally.
    async fn refresh(&self, token: &str, ctx: &RequestContext) -> Result<RefreshResult, AuthError>;

    /// Rotates only when the token is close to expiry. Tokens that are not
    /// due come back unchanged with `rotated` unset.
    async fn refresh_if_due(
        &self,
        token: &str,
        ctx: &RequestContext,
    ) -> Result<RefreshResult, AuthError>;

    /// Describes the session behind an active token.
    async fn session(&self, token: &str) -> Result<SessionInfo, AuthError>;
}
