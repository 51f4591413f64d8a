use axum::{
    Extension, Json,
    extract::{Query, State},
};
use std::sync::Arc;

use super::validation::{validate_limit, validate_page};
use super::{ApiError, ApiResponse, AppState, AuditPageDto, AuditQuery};
use crate::constants::audit::DEFAULT_PAGE;
use crate::models::{AuditAction, AuditResource, Principal, RequestContext};

/// GET /audit-log?page=&limit=
/// Admin only. Non-admins get 403 before their parameters are looked at.
pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ctx: RequestContext,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<AuditPageDto>>, ApiError> {
    let guard = &state.shared.guard;
    guard
        .require_admin(&principal, AuditAction::AuditLogDenied, AuditResource::AuditLog, &ctx)
        .await?;

    let audit_config = &state.config().audit;
    let page = validate_page(query.page.as_deref(), DEFAULT_PAGE)?;
    let limit = validate_limit(
        query.limit.as_deref(),
        audit_config.default_page_size,
        audit_config.max_page_size,
    )?;

    let result = guard.view_audit_log(&principal, page, limit, &ctx).await?;

    Ok(Json(ApiResponse::success(AuditPageDto {
        entries: result.entries,
        total: result.total,
        page: result.page,
        limit: result.limit,
        total_pages: result.total_pages,
    })))
}
