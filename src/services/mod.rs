pub mod audit;
pub use audit::{AuditError, AuditLog};

pub mod credentials;
pub use credentials::{CredentialStore, StoreError, hash_password};

pub mod lockout;
pub use lockout::LockoutPolicy;

pub mod rate_limit;
pub use rate_limit::RateLimiter;

pub mod tokens;
pub use tokens::{TokenError, TokenManager};

pub mod guard;
pub use guard::AuthorizationGuard;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{
    AuthError, AuthService, LoginAttempt, LoginResult, RefreshResult, SessionInfo,
};
pub use auth_service_impl::DefaultAuthService;

pub mod script_service;
pub mod script_service_impl;
pub use script_service::{ScriptDownload, ScriptError, ScriptService};
pub use script_service_impl::InMemoryScriptService;

pub mod maintenance;
pub use maintenance::Sweeper;
