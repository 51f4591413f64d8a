use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState, BearerToken, LoginDto, LoginRequest, RefreshQuery, TokenDto,
};
use crate::models::{Principal, RequestContext};
use crate::services::{LoginAttempt, SessionInfo};

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the bearer token into a [`Principal`] and stores it in the request
/// extensions. Handlers behind this layer never see the raw token.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    token: BearerToken,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = state.shared.guard.resolve(token.as_deref(), &ctx).await?;

    tracing::Span::current().record("user_id", principal.account_id());
    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(token);

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// Reads the body leniently: anything that is not a JSON object with string
/// fields becomes a validation error once the rate limiter has had its say.
fn parse_login(body: &[u8]) -> LoginAttempt {
    let request: LoginRequest = serde_json::from_slice(body).unwrap_or_default();
    let as_string = |v: Option<serde_json::Value>| v.and_then(|v| v.as_str().map(str::to_string));

    LoginAttempt {
        username: as_string(request.username),
        secret: as_string(request.secret),
    }
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Json<ApiResponse<LoginDto>>, ApiError> {
    let result = state
        .shared
        .auth_service
        .login(parse_login(&body), &ctx)
        .await?;

    Ok(Json(ApiResponse::success(LoginDto {
        account_id: result.account_id,
        username: result.username,
        role: result.role,
        token: result.token,
        expires_at: result.expires_at,
    })))
}

/// POST /logout
/// Always succeeds, with or without a live token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    token: BearerToken,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .shared
        .auth_service
        .logout(token.as_deref(), &ctx)
        .await?;

    Ok(Json(ApiResponse::ok()))
}

/// POST /refresh-token
/// With `?ifDue=true` a token that is not close to expiry comes back as is.
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    token: BearerToken,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ApiResponse<TokenDto>>, ApiError> {
    let token = token.as_deref().unwrap_or_default();
    let auth = &state.shared.auth_service;

    let result = if query.if_due {
        auth.refresh_if_due(token, &ctx).await?
    } else {
        auth.refresh(token, &ctx).await?
    };

    Ok(Json(ApiResponse::success(TokenDto {
        token: result.token,
        expires_at: result.expires_at,
        rotated: result.rotated,
    })))
}

/// GET /session
pub async fn session(
    State(state): State<Arc<AppState>>,
    Extension(_principal): Extension<Principal>,
    Extension(token): Extension<BearerToken>,
) -> Result<Json<ApiResponse<SessionInfo>>, ApiError> {
    let info = state
        .shared
        .auth_service
        .session(token.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(ApiResponse::success(info)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_variants() {
        let ok = parse_login(br#"{"username":"alice","secret":"pw"}"#);
        assert_eq!(ok.username.as_deref(), Some("alice"));
        assert_eq!(ok.secret.as_deref(), Some("pw"));

        let alias = parse_login(br#"{"username":"alice","password":"pw"}"#);
        assert_eq!(alias.secret.as_deref(), Some("pw"));

        let wrong_type = parse_login(br#"{"username":["alice"],"secret":1}"#);
        assert!(wrong_type.username.is_none());
        assert!(wrong_type.secret.is_none());

        let garbage = parse_login(b"not json");
        assert!(garbage.username.is_none());
    }
}
