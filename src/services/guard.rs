//! Resolves bearer tokens into principals.
//!
//! Every protected operation goes through [`AuthorizationGuard::resolve`]. The
//! role always comes from the account record, never from the caller.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{
    AccountId, AuditAction, AuditPage, AuditResource, NewAuditEntry, Principal, RequestContext,
};
use crate::services::audit::AuditLog;
use crate::services::auth_service::AuthError;
use crate::services::credentials::CredentialStore;
use crate::services::tokens::TokenManager;

pub struct AuthorizationGuard {
    credentials: Arc<CredentialStore>,
    tokens: Arc<TokenManager>,
    audit: Arc<AuditLog>,
}

impl AuthorizationGuard {
    #[must_use]
    pub fn new(
        credentials: Arc<CredentialStore>,
        tokens: Arc<TokenManager>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            credentials,
            tokens,
            audit,
        }
    }

    /// Missing, unknown, revoked and expired tokens all come back as
    /// [`AuthError::Unauthenticated`], as do tokens of disabled accounts.
    pub async fn resolve(
        &self,
        token: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<Principal, AuthError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return self.reject(None, ctx, "missing token").await;
        };

        let Ok(account_id) = self.tokens.validate(token).await else {
            return self.reject(None, ctx, "invalid or expired token").await;
        };

        match self.credentials.find_by_id(account_id).await {
            Some(account) if account.is_active => {
                debug!(account_id, "Resolved principal");
                Ok(Principal::new(account.id, account.role))
            }
            _ => {
                self.tokens.revoke(token).await;
                self.reject(Some(account_id), ctx, "account unavailable").await
            }
        }
    }

    /// Admin gate. Denials are audited against `resource`.
    pub async fn require_admin(
        &self,
        principal: &Principal,
        action: AuditAction,
        resource: AuditResource,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        if principal.is_admin() {
            return Ok(());
        }

        warn!(
            account_id = principal.account_id(),
            action = action.as_str(),
            "Admin access denied"
        );
        self.audit
            .record(
                NewAuditEntry::new(action, resource, principal.account_id().to_string(), ctx)
                    .account(Some(principal.account_id()))
                    .failed()
                    .details("admin role required"),
            )
            .await?;
        Err(AuthError::Forbidden)
    }

    /// One page of the audit log for an admin. The page is taken before the
    /// viewing itself is recorded, so it never contains its own entry.
    pub async fn view_audit_log(
        &self,
        principal: &Principal,
        page: usize,
        limit: usize,
        ctx: &RequestContext,
    ) -> Result<AuditPage, AuthError> {
        self.require_admin(principal, AuditAction::AuditLogDenied, AuditResource::AuditLog, ctx)
            .await?;

        let result = self.audit.query(page, limit).await;

        self.audit
            .record(
                NewAuditEntry::new(
                    AuditAction::ViewAuditLog,
                    AuditResource::AuditLog,
                    format!("page={page},limit={limit}"),
                    ctx,
                )
                .account(Some(principal.account_id())),
            )
            .await?;

        Ok(result)
    }

    async fn reject(
        &self,
        account_id: Option<AccountId>,
        ctx: &RequestContext,
        reason: &str,
    ) -> Result<Principal, AuthError> {
        debug!(origin = %ctx.origin, reason, "Token rejected");
        let entry = NewAuditEntry::new(
            AuditAction::TokenRejected,
            AuditResource::Auth,
            "token",
            ctx,
        )
        .account(account_id)
        .failed()
        .details(reason);

        // Anyone can present a bad token; only rejections tied to an account
        // are allowed to fail the request when the log is full.
        if account_id.is_some() {
            self.audit.record(entry).await?;
        } else {
            self.audit.record_unattributed(entry).await;
        }
        Err(AuthError::Unauthenticated)
    }
}
