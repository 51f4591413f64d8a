//! In-memory implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::models::{Account, AuditAction, AuditResource, NewAuditEntry, RequestContext};
use crate::services::audit::AuditLog;
use crate::services::auth_service::{
    AuthError, AuthService, LoginAttempt, LoginResult, RefreshResult, SessionInfo,
};
use crate::services::credentials::{CredentialStore, validate_secret, validate_username};
use crate::services::rate_limit::RateLimiter;
use crate::services::tokens::TokenManager;

pub struct DefaultAuthService {
    credentials: Arc<CredentialStore>,
    rate_limiter: Arc<RateLimiter>,
    tokens: Arc<TokenManager>,
    audit: Arc<AuditLog>,
    clock: Arc<dyn Clock>,
}

impl DefaultAuthService {
    #[must_use]
    pub fn new(
        credentials: Arc<CredentialStore>,
        rate_limiter: Arc<RateLimiter>,
        tokens: Arc<TokenManager>,
        audit: Arc<AuditLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            rate_limiter,
            tokens,
            audit,
            clock,
        }
    }

    async fn reject_login(
        &self,
        action: AuditAction,
        account: Option<&Account>,
        ctx: &RequestContext,
        details: &str,
        err: AuthError,
    ) -> Result<LoginResult, AuthError> {
        let resource_id = account.map_or_else(|| "unknown".to_string(), |a| a.id.to_string());
        let entry = NewAuditEntry::new(action, AuditResource::Auth, resource_id, ctx)
            .account(account.map(|a| a.id))
            .failed()
            .details(details);

        if account.is_some() {
            self.audit.record(entry).await?;
        } else {
            self.audit.record_unattributed(entry).await;
        }

        metrics::counter!("auth_login_attempts_total", "outcome" => outcome_label(&err))
            .increment(1);
        Err(err)
    }
}

/// What one gated login attempt concluded.
enum Attempt {
    Verified(Account),
    Failed(Account),
    Locked(Account),
    Disabled(Account),
}

const fn outcome_label(err: &AuthError) -> &'static str {
    match err {
        AuthError::RateLimited => "rate_limited",
        AuthError::AccountLocked => "locked",
        AuthError::AccountDisabled => "disabled",
        AuthError::InvalidCredentials => "invalid_credentials",
        AuthError::Validation(_) => "validation",
        _ => "error",
    }
}

fn required(
    field: Option<String>,
    validate: fn(&str) -> Result<(), &'static str>,
) -> Result<String, AuthError> {
    let value = field.ok_or_else(|| AuthError::Validation("Invalid request format".to_string()))?;
    validate(&value).map_err(|msg| AuthError::Validation(msg.to_string()))?;
    Ok(value)
}

#[async_trait]
impl AuthService for DefaultAuthService {
    async fn login(
        &self,
        attempt: LoginAttempt,
        ctx: &RequestContext,
    ) -> Result<LoginResult, AuthError> {
        if !self.rate_limiter.check(&ctx.origin).await {
            warn!(origin = %ctx.origin, "Login rate limited");
            return self
                .reject_login(
                    AuditAction::LoginRateLimited,
                    None,
                    ctx,
                    "origin rate limit exceeded",
                    AuthError::RateLimited,
                )
                .await;
        }

        let username = required(attempt.username, validate_username)?;
        let secret = required(attempt.secret, validate_secret)?;

        let Some(found) = self.credentials.find_by_username(&username).await else {
            self.credentials.verify_dummy(&secret).await?;
            return self
                .reject_login(
                    AuditAction::LoginFailed,
                    None,
                    ctx,
                    "unknown username",
                    AuthError::InvalidCredentials,
                )
                .await;
        };

        let outcome = {
            let (_gate, account) = self.credentials.begin_attempt(found.id).await?;
            let now = self.clock.now();

            if !account.is_active {
                Attempt::Disabled(account)
            } else if !self.credentials.lockout().may_attempt(&account, now) {
                Attempt::Locked(account)
            } else if self.credentials.verify_password(&account, &secret).await? {
                Attempt::Verified(self.credentials.apply_success(account.id, now, ctx).await?)
            } else {
                let updated = self.credentials.apply_failure(account.id, now, ctx).await?;
                if self.credentials.lockout().is_locked(&updated, now) {
                    warn!(
                        account_id = updated.id,
                        failed_attempts = updated.failed_attempts,
                        "Account locked after repeated failures"
                    );
                }
                Attempt::Failed(updated)
            }
        };

        let account = match outcome {
            Attempt::Verified(account) => account,
            Attempt::Disabled(account) => {
                return self
                    .reject_login(
                        AuditAction::LoginDisabled,
                        Some(&account),
                        ctx,
                        "account disabled",
                        AuthError::AccountDisabled,
                    )
                    .await;
            }
            Attempt::Locked(account) => {
                warn!(
                    account_id = account.id,
                    origin = %ctx.origin,
                    "Login attempt on locked account"
                );
                return self
                    .reject_login(
                        AuditAction::LoginLocked,
                        Some(&account),
                        ctx,
                        "account locked",
                        AuthError::AccountLocked,
                    )
                    .await;
            }
            Attempt::Failed(account) => {
                return self
                    .reject_login(
                        AuditAction::LoginFailed,
                        Some(&account),
                        ctx,
                        "wrong password",
                        AuthError::InvalidCredentials,
                    )
                    .await;
            }
        };

        let token = self.tokens.issue(account.id).await;

        let recorded = self
            .audit
            .record(
                NewAuditEntry::new(
                    AuditAction::Login,
                    AuditResource::Auth,
                    account.id.to_string(),
                    ctx,
                )
                .account(Some(account.id)),
            )
            .await;
        if let Err(e) = recorded {
            self.tokens.revoke(&token.value).await;
            return Err(e.into());
        }

        metrics::counter!("auth_login_attempts_total", "outcome" => "success").increment(1);
        info!(account_id = account.id, origin = %ctx.origin, "Login succeeded");

        Ok(LoginResult {
            account_id: account.id,
            username: account.username,
            role: account.role,
            token: token.value,
            expires_at: token.expires_at,
        })
    }

    async fn logout(&self, token: Option<&str>, ctx: &RequestContext) -> Result<(), AuthError> {
        let Some(token) = token else {
            return Ok(());
        };

        if let Some(revoked) = self.tokens.revoke(token).await {
            self.audit
                .record(
                    NewAuditEntry::new(
                        AuditAction::Logout,
                        AuditResource::Auth,
                        revoked.account_id.to_string(),
                        ctx,
                    )
                    .account(Some(revoked.account_id)),
                )
                .await?;
            info!(account_id = revoked.account_id, "Logged out");
        }

        Ok(())
    }

    async fn refresh(&self, token: &str, ctx: &RequestContext) -> Result<RefreshResult, AuthError> {
        let Ok(fresh) = self.tokens.rotate(token).await else {
            self.audit
                .record_unattributed(
                    NewAuditEntry::new(
                        AuditAction::TokenRejected,
                        AuditResource::Auth,
                        "refresh",
                        ctx,
                    )
                    .failed()
                    .details("refresh with invalid or expired token"),
                )
                .await;
            return Err(AuthError::Unauthenticated);
        };

        let active = self
            .credentials
            .find_by_id(fresh.account_id)
            .await
            .is_some_and(|a| a.is_active);
        if !active {
            self.tokens.revoke(&fresh.value).await;
            self.audit
                .record(
                    NewAuditEntry::new(
                        AuditAction::TokenRejected,
                        AuditResource::Auth,
                        fresh.account_id.to_string(),
                        ctx,
                    )
                    .account(Some(fresh.account_id))
                    .failed()
                    .details("account unavailable"),
                )
                .await?;
            return Err(AuthError::Unauthenticated);
        }

        let recorded = self
            .audit
            .record(
                NewAuditEntry::new(
                    AuditAction::TokenRefresh,
                    AuditResource::Auth,
                    fresh.account_id.to_string(),
                    ctx,
                )
                .account(Some(fresh.account_id)),
            )
            .await;
        if let Err(e) = recorded {
            self.tokens.revoke(&fresh.value).await;
            return Err(e.into());
        }

        Ok(RefreshResult {
            token: fresh.value,
            expires_at: fresh.expires_at,
            rotated: true,
        })
    }

    async fn refresh_if_due(
        &self,
        token: &str,
        ctx: &RequestContext,
    ) -> Result<RefreshResult, AuthError> {
        if let Ok(current) = self.tokens.get(token).await
            && !self.tokens.is_refresh_due(&current)
            && self
                .credentials
                .find_by_id(current.account_id)
                .await
                .is_some_and(|a| a.is_active)
        {
            return Ok(RefreshResult {
                token: current.value,
                expires_at: current.expires_at,
                rotated: false,
            });
        }

        // Due, dead or orphaned: a full refresh rotates or rejects it.
        self.refresh(token, ctx).await
    }

    async fn session(&self, token: &str) -> Result<SessionInfo, AuthError> {
        let current = self
            .tokens
            .get(token)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        let account = self
            .credentials
            .find_by_id(current.account_id)
            .await
            .filter(|a| a.is_active)
            .ok_or(AuthError::Unauthenticated)?;

        Ok(SessionInfo {
            account_id: account.id,
            role: account.role,
            issued_at: current.issued_at,
            expires_at: current.expires_at,
            refresh_due: self.tokens.is_refresh_due(&current),
        })
    }
}
