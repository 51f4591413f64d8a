pub mod account;
pub mod audit;
pub mod request;
pub mod script;
pub mod session;

pub use account::{Account, AccountId, Role};
pub use audit::{AuditAction, AuditEntry, AuditPage, AuditResource, NewAuditEntry};
pub use request::RequestContext;
pub use script::{Script, ScriptSummary, content_digest, format_size, validate_script_id};
pub use session::{Principal, SessionToken};
