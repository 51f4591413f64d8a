//! Domain service for the script catalog.
//!
//! Every operation takes an already resolved [`Principal`]; visibility is
//! decided here, never from client-supplied ids or roles.

use serde::Serialize;
use thiserror::Error;

use crate::models::{Principal, RequestContext, Script, ScriptSummary};
use crate::services::audit::AuditError;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Script not found")]
    NotFound,

    #[error("Access denied")]
    Forbidden,

    /// Stored content no longer matches its recorded digest.
    #[error("Script integrity check failed")]
    Integrity,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuditError> for ScriptError {
    fn from(err: AuditError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDownload {
    pub id: String,
    pub file_name: String,
    pub content: String,
    pub integrity_hash: String,
    pub download_count: u64,
}

#[async_trait::async_trait]
pub trait ScriptService: Send + Sync {
    /// Scripts visible to `principal`, ordered by id.
    async fn list(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
    ) -> Result<Vec<ScriptSummary>, ScriptError>;

    /// # Errors
    ///
    /// [`ScriptError::NotFound`] for unknown ids and [`ScriptError::Forbidden`]
    /// when the script exists but is not visible to `principal`.
    async fn get(
        &self,
        principal: &Principal,
        id: &str,
        ctx: &RequestContext,
    ) -> Result<Script, ScriptError>;

    /// Same authorization as [`ScriptService::get`]. Content that fails its
    /// integrity check is never served and the download is not counted.
    async fn download(
        &self,
        principal: &Principal,
        id: &str,
        ctx: &RequestContext,
    ) -> Result<ScriptDownload, ScriptError>;
}
