/*
 * Responsibility
 * - Call-level error taxonomy shared by every interceptor stage
 * - IntoResponse implementation (HTTP status / JSON error body)
 * - The inner message is the cause for logs; it is never sent to the caller
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated(cause: impl Into<String>) -> Self {
        Self::Unauthenticated(cause.into())
    }

    pub fn permission_denied(cause: impl Into<String>) -> Self {
        Self::PermissionDenied(cause.into())
    }

    pub fn internal(cause: impl Into<String>) -> Self {
        Self::Internal(cause.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code used in the response body and in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// The cause recorded by the stage that failed.
    pub fn cause(&self) -> &str {
        match self {
            AppError::Unauthenticated(cause)
            | AppError::PermissionDenied(cause)
            | AppError::Internal(cause) => cause,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::PermissionDenied(_) => "permission denied",
            AppError::Internal(_) => "internal server error",
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn response_hides_the_cause() {
        let resp = AppError::unauthenticated("ExpiredSignature for kid abc").into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
        assert_eq!(body["error"]["message"], "unauthenticated");
        assert!(!String::from_utf8_lossy(&bytes).contains("kid abc"));
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            AppError::permission_denied("x").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::internal("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::internal("boom").cause(), "boom");
    }
}
