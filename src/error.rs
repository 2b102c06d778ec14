use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types
///
/// Every caller-facing rejection maps to one of these kinds. The response
/// body is always `{"detail": ...}` with a message safe to show a caller;
/// upstream failure detail is logged at the call site and never returned.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
    /// Missing or invalid caller credential
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Caller exceeded its per-identity request budget
    #[error("rate limit exceeded")]
    TooManyRequests,
    /// Malformed or incomplete request body
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Upstream provider failure; the message is internal detail
    #[error("upstream error: {0}")]
    Upstream(String),
    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::Config(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::TooManyRequests => {
                (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded".to_string())
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Never leak provider internals to the caller.
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "model provider error".to_string()),
        };

        let body = Json(json!({ "detail": detail }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_error_display() {
        let error = AppError::BadRequest("missing 'question' field".to_string());
        assert_eq!(error.to_string(), "bad request: missing 'question' field");
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let error = AppError::Unauthorized("invalid api key".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let response = AppError::TooManyRequests.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_upstream_response_hides_detail() {
        let error = AppError::Upstream("connect timeout to 10.0.0.5:443".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "model provider error");
        assert!(!body.to_string().contains("10.0.0.5"));
    }
}
