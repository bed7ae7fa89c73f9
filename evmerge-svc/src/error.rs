//! HTTP error type for evmerge-svc

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g. export of a task that has not completed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// evmerge-common error
    #[error("Common error: {0}")]
    Common(#[from] evmerge_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use evmerge_common::Error as CommonError;

        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(err) => match err {
                CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                CommonError::InvalidFilterSpec(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_FILTER_SPEC", msg)
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    other.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_map_to_client_statuses() {
        let not_found = ApiError::from(evmerge_common::Error::NotFound("Task not found: 9".into()));
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::from(evmerge_common::Error::InvalidFilterSpec("bad".into()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let source = ApiError::from(evmerge_common::Error::SourceUnavailable("gone".into()));
        assert_eq!(source.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
