use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::net::IpAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::config::Config;
use crate::state::SharedState;

mod audit;
pub mod auth;
pub mod context;
mod error;
mod observability;
mod scripts;
mod system;
mod types;
mod validation;

pub use context::BearerToken;
pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    /// Peers allowed to name the real client in `X-Forwarded-For`.
    pub trusted_proxies: Vec<IpAddr>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }
}

pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let trusted_proxies = shared.config.security.trusted_proxies()?;

    Ok(Arc::new(AppState {
        shared,
        trusted_proxies,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/health", get(system::health))
        .route("/metrics", get(observability::get_metrics))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(middleware::from_fn(observability::track_metrics))
}

/// `user_id` starts empty and is filled in by the auth middleware.
fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        user_id = tracing::field::Empty,
    )
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", get(auth::session))
        .route("/resources", get(scripts::list_scripts))
        .route("/resources/{id}", get(scripts::get_script))
        .route("/resources/{id}/download", post(scripts::download_script))
        .route("/audit-log", get(audit::get_audit_log))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
