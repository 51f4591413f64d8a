//! Per-request caller identification: origin address, agent and bearer token.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::AppState;
use crate::constants::{UNKNOWN_AGENT, UNKNOWN_ORIGIN};
use crate::models::RequestContext;

/// Agent strings longer than this are cut before they reach the audit log.
const MAX_AGENT_LEN: usize = 512;

impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let origin = resolve_origin(peer, &parts.headers, &state.trusted_proxies);
        let agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .filter(|s| !s.is_empty())
            .map_or_else(
                || UNKNOWN_AGENT.to_string(),
                |s| s.chars().take(MAX_AGENT_LEN).collect(),
            );

        Ok(Self::new(origin, agent))
    }
}

/// Bearer token from the `Authorization` header, if any.
#[derive(Debug, Clone, Default)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_bearer(&parts.headers)))
    }
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    None
}

/// The socket peer, unless the peer is a trusted proxy that supplied
/// `X-Forwarded-For`, in which case the first forwarded address wins.
pub fn resolve_origin(
    peer: Option<IpAddr>,
    headers: &HeaderMap,
    trusted_proxies: &[IpAddr],
) -> String {
    let Some(peer) = peer else {
        return UNKNOWN_ORIGIN.to_string();
    };

    if trusted_proxies.contains(&peer)
        && let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(forwarded) = forwarded.to_str()
        && let Some(client) = forwarded
            .split(',')
            .next()
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return client.to_string();
    }

    peer.to_string()
}
