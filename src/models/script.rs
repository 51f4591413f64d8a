use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::account::AccountId;
use super::session::Principal;
use crate::constants::limits::MAX_RESOURCE_ID_LEN;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub id: String,
    pub name: String,
    pub description: String,
    pub language: String,
    pub category: String,
    pub file_size: String,
    pub date_added: String,
    pub owner_account_id: AccountId,
    pub is_public: bool,
    pub access_level: u32,
    pub download_count: u64,
    /// Hex SHA-256 of `source_code`.
    pub integrity_hash: String,
    pub source_code: String,
    pub last_modified: DateTime<Utc>,
}

impl Script {
    /// Admins see everything; everyone else sees public scripts and their own.
    #[must_use]
    pub fn is_visible_to(&self, principal: &Principal) -> bool {
        principal.is_admin() || self.is_public || self.owner_account_id == principal.account_id()
    }

    #[must_use]
    pub fn integrity_ok(&self) -> bool {
        content_digest(&self.source_code).eq_ignore_ascii_case(&self.integrity_hash)
    }
}

/// Listing view of a script: everything except the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub language: String,
    pub category: String,
    pub file_size: String,
    pub date_added: String,
    pub owner_account_id: AccountId,
    pub is_public: bool,
    pub access_level: u32,
    pub download_count: u64,
    pub last_modified: DateTime<Utc>,
}

impl From<&Script> for ScriptSummary {
    fn from(script: &Script) -> Self {
        Self {
            id: script.id.clone(),
            name: script.name.clone(),
            description: script.description.clone(),
            language: script.language.clone(),
            category: script.category.clone(),
            file_size: script.file_size.clone(),
            date_added: script.date_added.clone(),
            owner_account_id: script.owner_account_id,
            is_public: script.is_public,
            access_level: script.access_level,
            download_count: script.download_count,
            last_modified: script.last_modified,
        }
    }
}

/// Human readable size, e.g. `812 B` or `2.4 KB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[must_use]
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Script ids appear in URLs, so they are kept to a path-safe charset.
pub fn validate_script_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("Resource ID cannot be empty");
    }
    if id.len() > MAX_RESOURCE_ID_LEN {
        return Err("Resource ID is too long");
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("Resource ID can only contain letters, numbers, hyphens, underscores and dots");
    }
    Ok(())
}
