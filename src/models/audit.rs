use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::account::AccountId;
use super::request::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    LoginFailed,
    LoginRateLimited,
    LoginLocked,
    LoginDisabled,
    Logout,
    TokenRefresh,
    TokenRejected,
    ListScripts,
    GetScript,
    GetScriptNotFound,
    GetScriptDenied,
    DownloadScript,
    DownloadNotFound,
    DownloadDenied,
    DownloadIntegrityFailed,
    ViewAuditLog,
    AuditLogDenied,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::LoginRateLimited => "LOGIN_RATE_LIMITED",
            Self::LoginLocked => "LOGIN_LOCKED",
            Self::LoginDisabled => "LOGIN_DISABLED",
            Self::Logout => "LOGOUT",
            Self::TokenRefresh => "TOKEN_REFRESH",
            Self::TokenRejected => "TOKEN_REJECTED",
            Self::ListScripts => "LIST_SCRIPTS",
            Self::GetScript => "GET_SCRIPT",
            Self::GetScriptNotFound => "GET_SCRIPT_NOT_FOUND",
            Self::GetScriptDenied => "GET_SCRIPT_DENIED",
            Self::DownloadScript => "DOWNLOAD_SCRIPT",
            Self::DownloadNotFound => "DOWNLOAD_NOT_FOUND",
            Self::DownloadDenied => "DOWNLOAD_DENIED",
            Self::DownloadIntegrityFailed => "DOWNLOAD_INTEGRITY_FAILED",
            Self::ViewAuditLog => "VIEW_AUDIT_LOG",
            Self::AuditLogDenied => "AUDIT_LOG_DENIED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditResource {
    Auth,
    Script,
    AuditLog,
}

/// An immutable, appended audit record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub account_id: Option<AccountId>,
    pub action: AuditAction,
    pub resource_type: AuditResource,
    pub resource_id: String,
    pub timestamp: DateTime<Utc>,
    pub origin: String,
    pub agent: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Everything the caller decides about an entry; the log assigns id and time.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub account_id: Option<AccountId>,
    pub action: AuditAction,
    pub resource_type: AuditResource,
    pub resource_id: String,
    pub origin: String,
    pub agent: String,
    pub success: bool,
    pub details: Option<String>,
}

impl NewAuditEntry {
    pub fn new(
        action: AuditAction,
        resource_type: AuditResource,
        resource_id: impl Into<String>,
        ctx: &RequestContext,
    ) -> Self {
        Self {
            account_id: None,
            action,
            resource_type,
            resource_id: resource_id.into(),
            origin: ctx.origin.clone(),
            agent: ctx.agent.clone(),
            success: true,
            details: None,
        }
    }

    #[must_use]
    pub const fn account(mut self, account_id: Option<AccountId>) -> Self {
        self.account_id = account_id;
        self
    }

    #[must_use]
    pub const fn failed(mut self) -> Self {
        self.success = false;
        self
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// One page of audit entries, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPage {
    pub entries: Vec<AuditEntry>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}
