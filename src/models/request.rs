use crate::constants::{UNKNOWN_AGENT, UNKNOWN_ORIGIN};

/// Caller details captured once per inbound request and passed explicitly to
/// every service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub origin: String,
    pub agent: String,
}

impl RequestContext {
    #[must_use]
    pub fn new(origin: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            agent: agent.into(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(UNKNOWN_ORIGIN, UNKNOWN_AGENT)
    }
}
