use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::validate_resource_id;
use super::{ApiError, ApiResponse, AppState, DownloadDto, ScriptDto, ScriptListDto};
use crate::models::{Principal, RequestContext};

/// GET /resources
pub async fn list_scripts(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ctx: RequestContext,
) -> Result<Json<ApiResponse<ScriptListDto>>, ApiError> {
    let resources = state.shared.script_service.list(&principal, &ctx).await?;
    Ok(Json(ApiResponse::success(ScriptListDto { resources })))
}

/// GET /resources/{id}
pub async fn get_script(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ScriptDto>>, ApiError> {
    let id = validate_resource_id(&id)?;
    let resource = state
        .shared
        .script_service
        .get(&principal, id, &ctx)
        .await?;
    Ok(Json(ApiResponse::success(ScriptDto { resource })))
}

/// POST /resources/{id}/download
pub async fn download_script(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DownloadDto>>, ApiError> {
    let id = validate_resource_id(&id)?;
    let download = state
        .shared
        .script_service
        .download(&principal, id, &ctx)
        .await?;
    Ok(Json(ApiResponse::success(DownloadDto { download })))
}
