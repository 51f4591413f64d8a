use serde::{Deserialize, Serialize};

use crate::models::{AccountId, AuditEntry, Role, Script, ScriptSummary};
use crate::services::ScriptDownload;

/// Envelope for every JSON response. Payload fields sit next to `success`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub const fn ok() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
        }
    }
}

/// Login body. Both fields stay untyped so missing or non-string values
/// surface as validation errors instead of a generic 422.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<serde_json::Value>,
    #[serde(default, alias = "password")]
    pub secret: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub rotated: bool,
}

/// `POST /refresh-token?ifDue=true` only rotates tokens close to expiry.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshQuery {
    #[serde(default)]
    pub if_due: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginDto {
    pub account_id: AccountId,
    pub username: String,
    pub role: Role,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ScriptListDto {
    pub resources: Vec<ScriptSummary>,
}

#[derive(Debug, Serialize)]
pub struct ScriptDto {
    pub resource: Script,
}

#[derive(Debug, Serialize)]
pub struct DownloadDto {
    pub download: ScriptDownload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPageDto {
    pub entries: Vec<AuditEntry>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}
