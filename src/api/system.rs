//! Liveness endpoint.

use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiResponse, AppState, HealthDto};

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthDto>> {
    Json(ApiResponse::success(HealthDto {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    }))
}
