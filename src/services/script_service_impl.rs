use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::clock::Clock;
use crate::config::ScriptSeed;
use crate::models::{
    AuditAction, AuditResource, NewAuditEntry, Principal, RequestContext, Script, ScriptSummary,
    content_digest, format_size,
};
use crate::services::audit::AuditLog;
use crate::services::script_service::{ScriptDownload, ScriptError, ScriptService};

/// Catalog held in memory, keyed by script id.
pub struct InMemoryScriptService {
    scripts: RwLock<BTreeMap<String, Script>>,
    audit: Arc<AuditLog>,
}

struct Denials {
    not_found: AuditAction,
    forbidden: AuditAction,
}

const GET_DENIALS: Denials = Denials {
    not_found: AuditAction::GetScriptNotFound,
    forbidden: AuditAction::GetScriptDenied,
};

const DOWNLOAD_DENIALS: Denials = Denials {
    not_found: AuditAction::DownloadNotFound,
    forbidden: AuditAction::DownloadDenied,
};

impl InMemoryScriptService {
    #[must_use]
    pub fn new(scripts: Vec<Script>, audit: Arc<AuditLog>) -> Self {
        let scripts = scripts.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            scripts: RwLock::new(scripts),
            audit,
        }
    }

    /// Builds the catalog from config seeds. A seed without an integrity hash
    /// gets one computed from its content.
    #[must_use]
    pub fn from_seeds(seeds: &[ScriptSeed], clock: &dyn Clock, audit: Arc<AuditLog>) -> Self {
        let now = clock.now();
        let scripts = seeds
            .iter()
            .map(|seed| Script {
                id: seed.id.clone(),
                name: seed.name.clone(),
                description: seed.description.clone(),
                language: seed.language.clone(),
                category: seed.category.clone(),
                file_size: format_size(seed.source_code.len()),
                date_added: seed.date_added.clone(),
                owner_account_id: seed.owner_account_id,
                is_public: seed.is_public,
                access_level: seed.access_level,
                download_count: seed.download_count,
                integrity_hash: seed
                    .integrity_hash
                    .clone()
                    .unwrap_or_else(|| content_digest(&seed.source_code)),
                source_code: seed.source_code.clone(),
                last_modified: now,
            })
            .collect();
        Self::new(scripts, audit)
    }

    pub async fn len(&self) -> usize {
        self.scripts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn audit_outcome(
        &self,
        action: AuditAction,
        principal: &Principal,
        id: &str,
        ctx: &RequestContext,
        success: bool,
    ) -> Result<(), ScriptError> {
        let mut entry = NewAuditEntry::new(action, AuditResource::Script, id, ctx)
            .account(Some(principal.account_id()));
        if !success {
            entry = entry.failed();
        }
        self.audit.record(entry).await?;
        Ok(())
    }

    /// Applies the visibility rule to one script, auditing a denial.
    async fn authorize<'a>(
        &self,
        principal: &Principal,
        id: &str,
        script: Option<&'a Script>,
        denials: &Denials,
        ctx: &RequestContext,
    ) -> Result<&'a Script, ScriptError> {
        match script {
            None => {
                self.audit_outcome(denials.not_found, principal, id, ctx, false)
                    .await?;
                Err(ScriptError::NotFound)
            }
            Some(script) if !script.is_visible_to(principal) => {
                self.audit_outcome(denials.forbidden, principal, id, ctx, false)
                    .await?;
                Err(ScriptError::Forbidden)
            }
            Some(script) => Ok(script),
        }
    }
}

#[async_trait]
impl ScriptService for InMemoryScriptService {
    async fn list(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
    ) -> Result<Vec<ScriptSummary>, ScriptError> {
        let visible: Vec<ScriptSummary> = self
            .scripts
            .read()
            .await
            .values()
            .filter(|s| s.is_visible_to(principal))
            .map(ScriptSummary::from)
            .collect();

        self.audit
            .record(
                NewAuditEntry::new(AuditAction::ListScripts, AuditResource::Script, "*", ctx)
                    .account(Some(principal.account_id()))
                    .details(format!("{} visible", visible.len())),
            )
            .await?;

        Ok(visible)
    }

    async fn get(
        &self,
        principal: &Principal,
        id: &str,
        ctx: &RequestContext,
    ) -> Result<Script, ScriptError> {
        let scripts = self.scripts.read().await;
        let script = self
            .authorize(principal, id, scripts.get(id), &GET_DENIALS, ctx)
            .await?
            .clone();
        drop(scripts);

        self.audit_outcome(AuditAction::GetScript, principal, id, ctx, true)
            .await?;
        Ok(script)
    }

    async fn download(
        &self,
        principal: &Principal,
        id: &str,
        ctx: &RequestContext,
    ) -> Result<ScriptDownload, ScriptError> {
        // Held across verification and increment so concurrent downloads
        // each add exactly one.
        let mut scripts = self.scripts.write().await;

        let script = self
            .authorize(principal, id, scripts.get(id), &DOWNLOAD_DENIALS, ctx)
            .await?;

        if !script.integrity_ok() {
            error!(script_id = %id, "Integrity check failed, refusing download");
            self.audit
                .record(
                    NewAuditEntry::new(
                        AuditAction::DownloadIntegrityFailed,
                        AuditResource::Script,
                        id,
                        ctx,
                    )
                    .account(Some(principal.account_id()))
                    .failed()
                    .details("content digest mismatch"),
                )
                .await?;
            return Err(ScriptError::Integrity);
        }

        let download = ScriptDownload {
            id: script.id.clone(),
            file_name: script.name.clone(),
            content: script.source_code.clone(),
            integrity_hash: script.integrity_hash.to_ascii_lowercase(),
            download_count: script.download_count.saturating_add(1),
        };

        // Audit first: a download that cannot be recorded is not counted.
        self.audit
            .record(
                NewAuditEntry::new(AuditAction::DownloadScript, AuditResource::Script, id, ctx)
                    .account(Some(principal.account_id()))
                    .details(format!("download #{}", download.download_count)),
            )
            .await?;

        if let Some(script) = scripts.get_mut(id) {
            script.download_count = download.download_count;
        }
        drop(scripts);

        metrics::counter!("script_downloads_total").increment(1);
        info!(
            script_id = %id,
            account_id = principal.account_id(),
            download_count = download.download_count,
            "Script downloaded"
        );

        Ok(download)
    }
}
