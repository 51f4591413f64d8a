use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::services::{
    AuditLog, AuthService, AuthorizationGuard, CredentialStore, DefaultAuthService,
    InMemoryScriptService, RateLimiter, ScriptService, Sweeper, TokenManager,
};

/// Every process-wide store, each owning its own lock, wired together once at
/// startup and injected into the HTTP layer.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub clock: Arc<dyn Clock>,

    pub credentials: Arc<CredentialStore>,

    pub rate_limiter: Arc<RateLimiter>,

    pub tokens: Arc<TokenManager>,

    pub audit: Arc<AuditLog>,

    pub guard: Arc<AuthorizationGuard>,

    pub auth_service: Arc<dyn AuthService>,

    pub script_service: Arc<dyn ScriptService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(config: Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let security = &config.security;

        let credentials = Arc::new(CredentialStore::from_seeds(security, &config.accounts).await?);
        let rate_limiter = Arc::new(RateLimiter::new(&security.rate_limit, clock.clone()));
        let tokens = Arc::new(TokenManager::new(&security.tokens, clock.clone()));
        let audit = Arc::new(AuditLog::new(&config.audit, clock.clone()));

        let guard = Arc::new(AuthorizationGuard::new(
            credentials.clone(),
            tokens.clone(),
            audit.clone(),
        ));

        let auth_service = Arc::new(DefaultAuthService::new(
            credentials.clone(),
            rate_limiter.clone(),
            tokens.clone(),
            audit.clone(),
            clock.clone(),
        )) as Arc<dyn AuthService>;

        let script_service = Arc::new(InMemoryScriptService::from_seeds(
            &config.scripts,
            clock.as_ref(),
            audit.clone(),
        )) as Arc<dyn ScriptService>;

        Ok(Self {
            config: Arc::new(config),
            clock,
            credentials,
            rate_limiter,
            tokens,
            audit,
            guard,
            auth_service,
            script_service,
        })
    }

    /// The maintenance sweeper for this state, if enabled in config.
    #[must_use]
    pub fn sweeper(&self) -> Option<Sweeper> {
        let maintenance = &self.config.maintenance;
        maintenance.enabled.then(|| {
            Sweeper::new(
                self.tokens.clone(),
                self.rate_limiter.clone(),
                self.audit.clone(),
                maintenance.sweep_interval_seconds,
            )
        })
    }
}
