use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AuthError, ScriptError};

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),

    Unauthorized(String),

    Forbidden(String),

    NotFound(String),

    Conflict(String),

    TooManyRequests(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::TooManyRequests(msg) => write!(f, "Too many requests: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ApiError::ValidationError(msg),
            AuthError::RateLimited => ApiError::TooManyRequests(
                "Too many login attempts. Please try again later".to_string(),
            ),
            AuthError::AccountLocked => ApiError::TooManyRequests(
                "Account temporarily locked. Please try again later".to_string(),
            ),
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::AccountDisabled => ApiError::Forbidden("Account disabled".to_string()),
            AuthError::Unauthenticated => {
                ApiError::Unauthorized("Authentication required".to_string())
            }
            AuthError::Forbidden => ApiError::Forbidden("Access denied".to_string()),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<ScriptError> for ApiError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            ScriptError::Forbidden => ApiError::Forbidden("Access denied".to_string()),
            ScriptError::Integrity => {
                ApiError::Conflict("Resource failed its integrity check".to_string())
            }
            ScriptError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(status(AuthError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AuthError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status(AuthError::AccountLocked), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::AccountDisabled), StatusCode::FORBIDDEN);
        assert_eq!(status(AuthError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status(AuthError::Internal("db".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_script_error_statuses() {
        assert_eq!(status(ScriptError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(ScriptError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status(ScriptError::Integrity), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_internal_detail_not_leaked() {
        use http_body_util::BodyExt;

        let detail = "audit log full (1000000 entries)".to_string();
        let response = ApiError::InternalError(detail).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("An internal error occurred"));
        assert!(!text.contains("audit"));
    }
}
