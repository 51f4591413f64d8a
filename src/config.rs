use anyhow::{Context, Result};
use argon2::password_hash::PasswordHash;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants;
use crate::models::{AccountId, Role, validate_script_id};
use crate::services::credentials::validate_username;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,

    pub audit: AuditConfig,

    pub maintenance: MaintenanceConfig,

    /// Accounts loaded into the in-memory credential store at startup.
    pub accounts: Vec<AccountSeed>,

    /// Catalog loaded at startup.
    pub scripts: Vec<ScriptSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Per-origin request throttling on the login endpoint.
    pub rate_limit: RateLimitConfig,

    /// Per-account lockout after repeated failures.
    pub lockout: LockoutConfig,

    pub tokens: TokenConfig,

    /// Trusted proxy IP addresses allowed to provide forwarded client IP headers.
    ///
    /// When empty, forwarded headers are ignored and the socket peer address
    /// is used as the request origin.
    pub trusted_proxy_ips: Vec<String>,
}

impl SecurityConfig {
    /// Parsed `trusted_proxy_ips`.
    pub fn trusted_proxies(&self) -> Result<Vec<IpAddr>> {
        self.trusted_proxy_ips
            .iter()
            .map(|ip| {
                ip.trim()
                    .parse::<IpAddr>()
                    .with_context(|| format!("Invalid trusted proxy IP: {ip}"))
            })
            .collect()
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            rate_limit: RateLimitConfig::default(),
            lockout: LockoutConfig::default(),
            tokens: TokenConfig::default(),
            trusted_proxy_ips: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per origin inside one window.
    pub max_requests: u32,

    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: constants::rate_limit::MAX_REQUESTS_PER_WINDOW,
            window_seconds: constants::rate_limit::WINDOW_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Failed attempts before the account locks.
    pub max_failures: u32,

    /// How long after the last failure the lock holds.
    pub cooldown_seconds: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failures: constants::lockout::MAX_FAILURES,
            cooldown_seconds: constants::lockout::COOLDOWN_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub ttl_seconds: u64,

    /// Remaining lifetime below which a token is rotated on demand.
    pub refresh_threshold_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: constants::tokens::TTL_SECONDS,
            refresh_threshold_seconds: constants::tokens::REFRESH_THRESHOLD_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Hard cap on retained entries. Once reached, further writes fail and
    /// the operation that needed them is refused.
    pub max_entries: usize,

    pub default_page_size: usize,

    pub max_page_size: usize,

    /// Per-origin throttle for entries no account can be held to. The last
    /// tenth of `max_entries` is never spent on them.
    pub unattributed_rate_limit: RateLimitConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_entries: constants::audit::MAX_ENTRIES,
            default_page_size: constants::audit::DEFAULT_PAGE_SIZE,
            max_page_size: constants::audit::MAX_PAGE_SIZE,
            unattributed_rate_limit: RateLimitConfig {
                max_requests: constants::audit::UNATTRIBUTED_PER_ORIGIN,
                window_seconds: constants::audit::UNATTRIBUTED_WINDOW_SECONDS,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub enabled: bool,

    pub sweep_interval_seconds: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "scriptvault".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub bind_address: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".to_string(),
            port: 6790,
            cors_allowed_origins: vec![
                "http://localhost:6790".to_string(),
                "http://127.0.0.1:6790".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSeed {
    pub id: AccountId,

    pub username: String,

    /// Argon2 PHC string, see `scriptvault hash-password`.
    pub password_hash: String,

    pub role: Role,

    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSeed {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub language: String,

    pub category: String,

    #[serde(default)]
    pub date_added: String,

    pub owner_account_id: AccountId,

    #[serde(default)]
    pub is_public: bool,

    #[serde(default)]
    pub access_level: u32,

    #[serde(default)]
    pub download_count: u64,

    pub source_code: String,

    /// Expected SHA-256 of `source_code`. Computed from the content when omitted.
    #[serde(default)]
    pub integrity_hash: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
            audit: AuditConfig::default(),
            maintenance: MaintenanceConfig::default(),
            accounts: Vec::new(),
            scripts: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("scriptvault").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".scriptvault").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        let security = &self.security;

        if security.rate_limit.max_requests == 0 || security.rate_limit.window_seconds == 0 {
            anyhow::bail!("Rate limit requests and window must be > 0");
        }

        if security.lockout.max_failures == 0 {
            anyhow::bail!("Lockout max_failures must be > 0");
        }

        if security.tokens.ttl_seconds == 0 {
            anyhow::bail!("Token TTL must be > 0");
        }

        if security.tokens.refresh_threshold_seconds >= security.tokens.ttl_seconds {
            anyhow::bail!("Token refresh threshold must be smaller than the token TTL");
        }

        if self.audit.max_page_size == 0
            || self.audit.default_page_size == 0
            || self.audit.default_page_size > self.audit.max_page_size
        {
            anyhow::bail!("Audit page sizes must be > 0 and default <= max");
        }

        let unattributed = &self.audit.unattributed_rate_limit;
        if unattributed.max_requests == 0 || unattributed.window_seconds == 0 {
            anyhow::bail!("Audit unattributed rate limit requests and window must be > 0");
        }

        if self.maintenance.enabled && self.maintenance.sweep_interval_seconds == 0 {
            anyhow::bail!("Maintenance sweep interval must be > 0 when enabled");
        }

        security.trusted_proxies()?;

        let mut usernames = HashSet::new();
        let mut account_ids = HashSet::new();
        for account in &self.accounts {
            validate_username(&account.username)
                .map_err(|e| anyhow::anyhow!("Invalid username '{}': {e}", account.username))?;
            if !usernames.insert(account.username.as_str()) {
                anyhow::bail!("Duplicate username in accounts: {}", account.username);
            }
            if !account_ids.insert(account.id) {
                anyhow::bail!("Duplicate account id: {}", account.id);
            }
            PasswordHash::new(&account.password_hash).map_err(|e| {
                anyhow::anyhow!("Invalid password hash for '{}': {e}", account.username)
            })?;
        }

        let mut script_ids = HashSet::new();
        for script in &self.scripts {
            validate_script_id(&script.id)
                .map_err(|e| anyhow::anyhow!("Invalid script id '{}': {e}", script.id))?;
            if !script_ids.insert(script.id.as_str()) {
                anyhow::bail!("Duplicate script id: {}", script.id);
            }
            if !account_ids.contains(&script.owner_account_id) {
                anyhow::bail!(
                    "Script '{}' is owned by unknown account {}",
                    script.id,
                    script.owner_account_id
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHC: &str = "$argon2id$v=19$m=8,t=1,p=1$c29tZXNhbHRzb21lc2FsdA$ZmFrZWhhc2hmYWtlaGFzaGZha2VoYXNoZmFrZWhhc2g";

    fn account(id: AccountId, username: &str) -> AccountSeed {
        AccountSeed {
            id,
            username: username.to_string(),
            password_hash: PHC.to_string(),
            role: Role::User,
            active: true,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.security.rate_limit.max_requests, 10);
        assert_eq!(config.security.rate_limit.window_seconds, 900);
        assert_eq!(config.security.lockout.max_failures, 5);
        assert_eq!(config.security.lockout.cooldown_seconds, 300);
        assert_eq!(config.security.tokens.ttl_seconds, 3600);
        assert_eq!(config.audit.default_page_size, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[security.rate_limit]"));
        assert!(toml_str.contains("[audit]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = format!(
            r#"
            [general]
            log_level = "debug"

            [security.lockout]
            max_failures = 3

            [[accounts]]
            id = 1
            username = "elliot"
            password_hash = "{PHC}"
            role = "admin"

            [[scripts]]
            id = "script-001"
            name = "port_scanner.py"
            language = "python"
            category = "reconnaissance"
            owner_account_id = 1
            is_public = true
            source_code = "print('hi')"
        "#
        );

        let config: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.security.lockout.max_failures, 3);
        assert_eq!(config.security.lockout.cooldown_seconds, 300);
        assert_eq!(config.accounts[0].role, Role::Admin);
        assert!(config.accounts[0].active);
        assert!(config.scripts[0].integrity_hash.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_usernames() {
        let config = Config {
            accounts: vec![account(1, "alice"), account(2, "alice")],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unusable_username() {
        let config = Config {
            accounts: vec![account(1, "alice smith")],
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("alice smith"));
    }

    #[test]
    fn test_validate_rejects_unusable_script_id() {
        let mut config: Config = toml::from_str(&format!(
            r#"
            [[accounts]]
            id = 1
            username = "alice"
            password_hash = "{PHC}"
            role = "user"

            [[scripts]]
            id = "script-001"
            name = "ok.sh"
            language = "bash"
            category = "utility"
            owner_account_id = 1
            source_code = "true"
        "#
        ))
        .unwrap();
        assert!(config.validate().is_ok());

        config.scripts[0].id = "my script".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("my script"));
    }

    #[test]
    fn test_validate_rejects_bad_hash() {
        let mut seed = account(1, "alice");
        seed.password_hash = "plaintext".to_string();
        let config = Config {
            accounts: vec![seed],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_threshold_above_ttl() {
        let mut config = Config::default();
        config.security.tokens.refresh_threshold_seconds = config.security.tokens.ttl_seconds;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_orphan_script() {
        let config = Config {
            accounts: vec![account(1, "alice")],
            scripts: vec![ScriptSeed {
                id: "s".to_string(),
                name: "s.sh".to_string(),
                description: String::new(),
                language: "bash".to_string(),
                category: "utility".to_string(),
                date_added: String::new(),
                owner_account_id: 99,
                is_public: false,
                access_level: 0,
                download_count: 0,
                source_code: String::new(),
                integrity_hash: None,
            }],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trusted_proxies_parsed() {
        let mut config = Config::default();
        config.security.trusted_proxy_ips = vec!["127.0.0.1".to_string(), " ::1 ".to_string()];
        assert_eq!(config.security.trusted_proxies().unwrap().len(), 2);

        config.security.trusted_proxy_ips.push("proxy.local".to_string());
        assert!(config.validate().is_err());
    }
}
